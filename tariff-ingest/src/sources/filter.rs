use anyhow::Context;
use tariff_model::domain::RawTariff;
use time::{macros::format_description, Date, OffsetDateTime};

use crate::config::FilterConfig;

/// Parse the date part of a `YYYY-MM-DD[ hh:mm:ss]` cell.
pub fn parse_date(s: &str) -> Option<Date> {
    let day = s.trim().get(..10)?;
    Date::parse(day, format_description!("[year]-[month]-[day]")).ok()
}

/// Row-level selection of tariffs worth decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct TariffFilter {
    pub sectors: Vec<String>,
    pub service_types: Vec<String>,
    pub capacity_kw: f64,
    pub cutoff: Date,
}

impl TariffFilter {
    pub fn from_config(cfg: &FilterConfig) -> anyhow::Result<Self> {
        let cutoff = match &cfg.date_cutoff {
            Some(s) => parse_date(s).with_context(|| format!("invalid filter.date_cutoff '{s}'"))?,
            None => OffsetDateTime::now_utc().date(),
        };
        Ok(Self {
            sectors: cfg.sectors.clone(),
            service_types: cfg.service_types.clone(),
            capacity_kw: cfg.capacity_kw,
            cutoff,
        })
    }

    /// Why `tariff` is filtered out, or `None` when it is kept.
    ///
    /// Missing capacity bounds and dates never exclude a tariff; a missing
    /// sector or service type always does.
    pub fn rejects(&self, tariff: &RawTariff) -> Option<&'static str> {
        let listed = |allowed: &[String], value: &Option<String>| {
            value.as_ref().is_some_and(|v| allowed.contains(v))
        };

        if !listed(&self.sectors, &tariff.sector) {
            return Some("sector");
        }
        if !listed(&self.service_types, &tariff.service_type) {
            return Some("service_type");
        }
        if tariff.peak_kw_capacity_min.is_some_and(|min| min > self.capacity_kw)
            || tariff.peak_kw_capacity_max.is_some_and(|max| max < self.capacity_kw)
        {
            return Some("capacity");
        }
        if tariff.start_date.is_some_and(|d| d > self.cutoff)
            || tariff.end_date.is_some_and(|d| d < self.cutoff)
        {
            return Some("date");
        }
        None
    }
}
