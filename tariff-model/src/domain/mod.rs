pub mod charge_record;
pub mod conversion;
pub mod raw_tariff;
pub mod tariff;

pub use charge_record::{units, ChargeRecord, ChargeType, TimeWindow, Utility};
pub use conversion::ConversionConstants;
pub use raw_tariff::{
    Field, MatrixShapeError, PeriodMatrix, RateStructure, RateTable, RawTariff, ScheduleSet,
    TierEntry, TierKey, HOURS_PER_DAY, MONTHS_PER_YEAR,
};
pub use tariff::{RejectedTariff, Tariff, TariffMetadata};
