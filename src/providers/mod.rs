pub mod mercadolibre;

pub use mercadolibre::MercadoLibreProvider;
