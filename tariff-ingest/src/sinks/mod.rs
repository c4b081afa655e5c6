pub mod tariff_table_dir;

pub use tariff_table_dir::TariffTableDirSink;
