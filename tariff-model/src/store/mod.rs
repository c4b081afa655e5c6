pub mod tariff_tables;

pub use tariff_tables::{
    list_tariff_tables, read_metadata, read_tariff_table, tariff_table_path, write_metadata,
    write_rejected, write_tariff_table,
};
