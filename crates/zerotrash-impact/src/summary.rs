use std::sync::LazyLock;

use exn::ResultExt;
use regex::Regex;

use crate::records::{CollectionTask, Error, Records, Report, Reward};

/// Kilograms of CO2 offset per kilogram of waste collected.
pub const CO2_PER_KG: f64 = 0.5;
/// How many recent reports and collection tasks [`fetch`] considers.
pub const RECENT_LIMIT: usize = 100;

static AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+(\.[0-9]+)?").expect("valid amount pattern"));

/// Aggregate numbers for the landing page.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactSummary {
    /// Kilograms, rounded to one decimal.
    pub waste_collected: f64,
    pub reports_submitted: usize,
    pub tokens_earned: i64,
    /// Kilograms, rounded to one decimal.
    pub co2_offset: f64,
}

/// The first decimal number in a free-text amount, `0.0` if there is none.
#[must_use]
pub fn parse_amount(text: &str) -> f64 {
    AMOUNT
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.0)
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[must_use]
pub fn summarize(
    reports: &[Report],
    rewards: &[Reward],
    tasks: &[CollectionTask],
) -> ImpactSummary {
    let waste_collected: f64 = tasks.iter().map(|t| parse_amount(&t.amount)).sum();
    let tokens_earned = rewards.iter().map(|r| r.points.unwrap_or(0)).sum();

    ImpactSummary {
        waste_collected: round_tenth(waste_collected),
        reports_submitted: reports.len(),
        tokens_earned,
        co2_offset: round_tenth(waste_collected * CO2_PER_KG),
    }
}

async fn load(records: &dyn Records) -> exn::Result<ImpactSummary, Error> {
    let reports = records
        .recent_reports(RECENT_LIMIT)
        .await
        .or_raise(|| Error::new("load recent reports"))?;
    let rewards = records
        .all_rewards()
        .await
        .or_raise(|| Error::new("load rewards"))?;
    let tasks = records
        .collection_tasks(RECENT_LIMIT)
        .await
        .or_raise(|| Error::new("load collection tasks"))?;

    tracing::debug!(
        reports = reports.len(),
        rewards = rewards.len(),
        tasks = tasks.len(),
        "loaded impact records"
    );
    Ok(summarize(&reports, &rewards, &tasks))
}

/// Load records and summarize them.
///
/// Failures are logged and reported as an all-zero summary, so the landing
/// page always has something to show.
pub async fn fetch(records: &dyn Records) -> ImpactSummary {
    match load(records).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!(%e, "failed to fetch impact data");
            ImpactSummary::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use futures_lite::future::block_on;

    use super::*;
    use crate::records::{Query, Snapshot};

    fn task(amount: &str) -> CollectionTask {
        CollectionTask {
            amount: amount.to_owned(),
            ..CollectionTask::default()
        }
    }

    fn reward(points: Option<i64>) -> Reward {
        Reward {
            points,
            ..Reward::default()
        }
    }

    #[test]
    fn amount_takes_first_number() {
        assert!((parse_amount("12.5 kg") - 12.5).abs() < f64::EPSILON);
        assert!((parse_amount("about 3kg, maybe 4") - 3.0).abs() < f64::EPSILON);
        assert!((parse_amount("7.") - 7.0).abs() < f64::EPSILON);
        assert!((parse_amount("-2 kg") - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn amount_skips_non_ascii_digits() {
        assert!((parse_amount("٣ bags, 5 kg") - 5.0).abs() < f64::EPSILON);
        assert!((parse_amount("１２ kg or 4 kg") - 4.0).abs() < f64::EPSILON);
        assert!(parse_amount("٣ bags").abs() < f64::EPSILON);
    }

    #[test]
    fn amount_without_number_is_zero() {
        assert!(parse_amount("a lot").abs() < f64::EPSILON);
        assert!(parse_amount("").abs() < f64::EPSILON);
    }

    #[test]
    fn summarizes_records() {
        let reports = vec![Report::default(); 3];
        let rewards = [reward(Some(10)), reward(None), reward(Some(25))];
        let tasks = [task("12.5 kg"), task("0.27kg"), task("unknown")];

        let summary = summarize(&reports, &rewards, &tasks);
        assert_eq!(
            summary,
            ImpactSummary {
                waste_collected: 12.8,
                reports_submitted: 3,
                tokens_earned: 35,
                co2_offset: 6.4,
            }
        );
    }

    #[test]
    fn empty_records_summarize_to_zero() {
        assert_eq!(summarize(&[], &[], &[]), ImpactSummary::default());
    }

    #[test]
    fn co2_is_derived_before_rounding() {
        let summary = summarize(&[], &[], &[task("0.25 kg"), task("0.04 kg")]);
        assert!((summary.waste_collected - 0.3).abs() < f64::EPSILON);
        assert!((summary.co2_offset - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn fetch_limits_reports_and_tasks() {
        let snapshot = Snapshot {
            reports: vec![Report::default(); RECENT_LIMIT + 20],
            rewards: vec![reward(Some(1)); RECENT_LIMIT + 20],
            tasks: vec![task("1 kg"); RECENT_LIMIT + 20],
        };
        let summary = block_on(fetch(&snapshot));
        assert_eq!(summary.reports_submitted, RECENT_LIMIT);
        assert!((summary.waste_collected - 100.0).abs() < f64::EPSILON);
        assert_eq!(summary.tokens_earned, 120);
    }

    struct Offline;

    fn offline<T>() -> exn::Result<Vec<T>, Error> {
        exn::bail!(Error::new("database unreachable"))
    }

    impl Records for Offline {
        fn recent_reports(&self, _limit: usize) -> Query<'_, Report> {
            Box::pin(async { offline::<Report>() })
        }

        fn all_rewards(&self) -> Query<'_, Reward> {
            Box::pin(async { offline::<Reward>() })
        }

        fn collection_tasks(&self, _limit: usize) -> Query<'_, CollectionTask> {
            Box::pin(async { offline::<CollectionTask>() })
        }
    }

    #[test]
    fn fetch_failure_yields_zero_summary() {
        assert_eq!(block_on(fetch(&Offline)), ImpactSummary::default());
    }
}
