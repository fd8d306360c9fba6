//! Shapes of the golf-data feed and the trait every feed client implements.

pub mod datagolf;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_with::serde_as;
use serde_with::VecSkipError;

use crate::error::GenericError;
use serde_things::{external_id, optional_number, optional_thru};

pub use datagolf::DataGolfClient;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScheduledEvent {
    #[serde(deserialize_with = "external_id")]
    pub event_id: String,
    pub event_name: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
}

/// A player as listed in the roster or in an event field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedPlayer {
    #[serde(rename = "dg_id", deserialize_with = "external_id")]
    pub player_id: String,
    pub player_name: String,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Ranking {
    #[serde(rename = "dg_id", deserialize_with = "external_id")]
    pub player_id: String,
    #[serde(rename = "dg_skill_estimate", default)]
    pub skill_estimate: Option<f64>,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldSnapshot {
    #[serde(default)]
    pub event_name: String,
    #[serde(default, deserialize_with = "optional_number")]
    pub current_round: Option<i32>,
    #[serde_as(as = "VecSkipError<_>")]
    #[serde(default)]
    pub field: Vec<FeedPlayer>,
}

/// Holes completed in the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Thru {
    Holes(i32),
    /// The feed's "F": the round is over for this player.
    Finished,
}

impl Thru {
    pub fn finished_round(&self) -> bool {
        matches!(self, Thru::Finished | Thru::Holes(18..))
    }

    /// Value stored in the results table, a finished round counts as 18 holes.
    pub fn holes(&self) -> i32 {
        match self {
            Thru::Holes(h) => *h,
            Thru::Finished => 18,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LiveRow {
    #[serde(rename = "dg_id", deserialize_with = "external_id")]
    pub player_id: String,
    #[serde(default)]
    pub player_name: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default, deserialize_with = "optional_number")]
    pub total: Option<i32>,
    #[serde(default, deserialize_with = "optional_thru")]
    pub thru: Option<Thru>,
    #[serde(default, deserialize_with = "optional_number")]
    pub round: Option<i32>,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LiveSnapshot {
    #[serde(default)]
    pub event_name: String,
    #[serde(default, deserialize_with = "optional_number")]
    pub current_round: Option<i32>,
    #[serde_as(as = "VecSkipError<_>")]
    #[serde(default)]
    pub live_stats: Vec<LiveRow>,
}

/// Read access to the external golf-data provider. Implementations do I/O only.
#[rocket::async_trait]
pub trait GolfFeed: Send + Sync {
    async fn schedule(&self, tour: &str) -> Result<Vec<ScheduledEvent>, GenericError>;
    async fn field(&self, tour: &str) -> Result<FieldSnapshot, GenericError>;
    async fn player_list(&self) -> Result<Vec<FeedPlayer>, GenericError>;
    async fn rankings(&self) -> Result<Vec<Ranking>, GenericError>;
    async fn live_stats(&self, tour: &str) -> Result<LiveSnapshot, GenericError>;
}

mod serde_things {
    use serde::de::Visitor;
    use serde::{de, Deserializer};
    use std::fmt;

    use super::Thru;

    /// Ids arrive as numbers from some endpoints and as strings from others.
    pub(super) fn external_id<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IdVisitor;

        impl<'de> Visitor<'de> for IdVisitor {
            type Value = String;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a number or a string id")
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<String, E> {
                Ok(value.to_string())
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<String, E> {
                Ok(value.to_string())
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<String, E> {
                if value.fract() == 0.0 {
                    Ok((value as i64).to_string())
                } else {
                    Err(E::custom(format!("fractional id {value}")))
                }
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<String, E> {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    Err(E::custom("empty id"))
                } else {
                    Ok(trimmed.to_string())
                }
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }

    struct OptionalNumberVisitor;

    impl<'de> Visitor<'de> for OptionalNumberVisitor {
        type Value = Option<i32>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a number, a numeric string or null")
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Option<i32>, E> {
            Ok(i32::try_from(value).ok())
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Option<i32>, E> {
            Ok(i32::try_from(value).ok())
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<Option<i32>, E> {
            Ok(Some(value.round() as i32))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Option<i32>, E> {
            let value = value.trim();
            if value.eq_ignore_ascii_case("e") {
                return Ok(Some(0));
            }
            Ok(value.trim_start_matches('+').parse().ok())
        }

        fn visit_none<E: de::Error>(self) -> Result<Option<i32>, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Option<i32>, E> {
            Ok(None)
        }
    }

    pub(super) fn optional_number<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(OptionalNumberVisitor)
    }

    pub(super) fn optional_thru<'de, D>(deserializer: D) -> Result<Option<Thru>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ThruVisitor;

        impl<'de> Visitor<'de> for ThruVisitor {
            type Value = Option<Thru>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a hole count, \"F\" or null")
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Option<Thru>, E> {
                Ok(i32::try_from(value).ok().map(Thru::Holes))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Option<Thru>, E> {
                Ok(i32::try_from(value).ok().map(Thru::Holes))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Option<Thru>, E> {
                let value = value.trim();
                if value.eq_ignore_ascii_case("f") {
                    Ok(Some(Thru::Finished))
                } else {
                    Ok(value.parse().ok().map(Thru::Holes))
                }
            }

            fn visit_none<E: de::Error>(self) -> Result<Option<Thru>, E> {
                Ok(None)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Option<Thru>, E> {
                Ok(None)
            }
        }

        deserializer.deserialize_any(ThruVisitor)
    }
}
