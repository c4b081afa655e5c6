use tariff_model::domain::{units, ChargeType, PeriodMatrix, RateStructure, RawTariff, ScheduleSet};

use super::{
    ranges::consecutive_ranges,
    schedule::{unpack_schedule, ScheduleLayout, UnpackOutcome},
};

pub const WEEKDAYS: (u8, u8) = (0, 4);
pub const WEEKEND: (u8, u8) = (5, 6);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouKind {
    Demand,
    Energy,
}

impl TouKind {
    fn structure(self) -> RateStructure {
        match self {
            TouKind::Demand => RateStructure::Demand,
            TouKind::Energy => RateStructure::Energy,
        }
    }

    fn units(self) -> &'static str {
        match self {
            TouKind::Demand => units::PER_KW,
            TouKind::Energy => units::PER_KWH,
        }
    }

    fn charge_type(self) -> ChargeType {
        match self {
            TouKind::Demand => ChargeType::Demand,
            TouKind::Energy => ChargeType::Energy,
        }
    }

    fn schedules(self, tariff: &RawTariff) -> &ScheduleSet {
        match self {
            TouKind::Demand => &tariff.demand_schedule,
            TouKind::Energy => &tariff.energy_schedule,
        }
    }
}

/// Decode the weekday then the weekend matrix of one time-of-use structure.
///
/// Returns nothing when neither matrix is present (the structure is not
/// offered). A single missing matrix is skipped.
pub fn decode_tou(tariff: &RawTariff, kind: TouKind) -> Vec<UnpackOutcome> {
    let schedules = kind.schedules(tariff);
    if schedules.is_absent() {
        return Vec::new();
    }

    [(&schedules.weekday, WEEKDAYS), (&schedules.weekend, WEEKEND)]
        .into_iter()
        .filter_map(|(matrix, weekdays)| {
            matrix
                .as_ref()
                .map(|m| unpack_matrix(tariff, m, kind, weekdays))
        })
        .collect()
}

fn unpack_matrix(
    tariff: &RawTariff,
    matrix: &PeriodMatrix,
    kind: TouKind,
    weekdays: (u8, u8),
) -> UnpackOutcome {
    let layout = ScheduleLayout {
        structure: kind.structure(),
        units: kind.units(),
        charge_type: kind.charge_type(),
        weekdays,
    };
    let month_ranges = consecutive_ranges(matrix.rows());
    unpack_schedule(&tariff.label, matrix, &month_ranges, &tariff.rates, &layout)
}
