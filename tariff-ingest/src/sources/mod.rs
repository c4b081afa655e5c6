pub mod cells;
pub mod filter;
pub mod tariff_table_dir;
pub mod usurdb_csv_file;

pub use filter::TariffFilter;
pub use tariff_table_dir::TariffTableDirSource;
pub use usurdb_csv_file::UsurdbCsvFileSource;
