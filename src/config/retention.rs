use serde::Deserialize;

/// Retention periods, in days, that the sink's retention API accepts.
/// Any other day count is refused at configuration time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u32")]
#[repr(u32)]
pub enum RetentionPolicy {
    OneDay = 1,
    ThreeDays = 3,
    FiveDays = 5,
    OneWeek = 7,
    TwoWeeks = 14,
    OneMonth = 30,
    TwoMonths = 60,
    ThreeMonths = 90,
    FourMonths = 120,
    FiveMonths = 150,
    SixMonths = 180,
    OneYear = 365,
    OneYearAndOneMonth = 400,
    OneYearAndSixMonths = 545,
    TwoYears = 731,
    FiveYears = 1827,
    TenYears = 3653,
}

impl RetentionPolicy {
    /// The period as the integer day count the sink expects on the wire.
    #[must_use]
    pub fn days(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for RetentionPolicy {
    type Error = String;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        let policy = match days {
            1 => Self::OneDay,
            3 => Self::ThreeDays,
            5 => Self::FiveDays,
            7 => Self::OneWeek,
            14 => Self::TwoWeeks,
            30 => Self::OneMonth,
            60 => Self::TwoMonths,
            90 => Self::ThreeMonths,
            120 => Self::FourMonths,
            150 => Self::FiveMonths,
            180 => Self::SixMonths,
            365 => Self::OneYear,
            400 => Self::OneYearAndOneMonth,
            545 => Self::OneYearAndSixMonths,
            731 => Self::TwoYears,
            1827 => Self::FiveYears,
            3653 => Self::TenYears,
            other => return Err(format!("{other} days is not a supported retention period")),
        };
        Ok(policy)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_supported_day_count() {
        let policy: RetentionPolicy = serde_json::from_str("14").unwrap();
        assert_eq!(policy, RetentionPolicy::TwoWeeks);
        assert_eq!(policy.days(), 14);
    }

    #[test]
    fn deserialize_unsupported_day_count() {
        let result: Result<RetentionPolicy, _> = serde_json::from_str("2");
        assert!(result.is_err());
    }

    #[test]
    fn round_trips_through_days() {
        for policy in [
            RetentionPolicy::OneDay,
            RetentionPolicy::OneMonth,
            RetentionPolicy::TenYears,
        ] {
            assert_eq!(RetentionPolicy::try_from(policy.days()), Ok(policy));
        }
    }
}
