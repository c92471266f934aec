use chrono::{DateTime as ChronoDateTime, Utc};
use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Timestamptz;
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

pub struct Timer<'a> {
    name: &'a str,
    start: std::time::Instant,
}

impl<'a> Timer<'a> {
    pub fn new(name: &'a str) -> Self {
        Self {
            name,
            start: std::time::Instant::now(),
        }
    }
}

impl<'a> Drop for Timer<'a> {
    fn drop(&mut self) {
        let elapsed_time = self.start.elapsed();
        let time_in_s = elapsed_time.as_secs_f32();
        match elapsed_time.as_nanos().ilog10() {
            0..3 => tracing::debug!("{} took {:.1}ns", self.name, time_in_s * 1e9),
            3..6 => tracing::debug!("{} took {:.1}μs", self.name, time_in_s * 1e6),
            6..9 => tracing::debug!("{} took {:.1}ms", self.name, time_in_s * 1e3),
            9..12 => tracing::debug!("{} took {:.1}s", self.name, time_in_s),
            12.. => tracing::debug!("{} took {:.0}s", self.name, time_in_s),
        }
    }
}

/// A wrapper for `chrono::DateTime<Utc>` that serializes/deserializes according to RFC 3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Timestamptz)]
pub struct DateTime(ChronoDateTime<Utc>);

impl DateTime {
    pub fn now() -> Self {
        Utc::now().into()
    }

    pub fn from_timestamp(epoch_seconds: i64) -> Option<Self> {
        ChronoDateTime::from_timestamp(epoch_seconds, 0).map(Self)
    }
}

impl Deref for DateTime {
    type Target = ChronoDateTime<Utc>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DateTime {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<ChronoDateTime<Utc>> for DateTime {
    fn from(value: ChronoDateTime<Utc>) -> Self {
        DateTime(value)
    }
}

impl<DB: Backend> ToSql<Timestamptz, DB> for DateTime
where
    ChronoDateTime<Utc>: ToSql<Timestamptz, DB>,
{
    fn to_sql<'a>(&'a self, out: &mut Output<'a, '_, DB>) -> serialize::Result {
        self.0.to_sql(out)
    }
}

impl<DB: Backend> FromSql<Timestamptz, DB> for DateTime
where
    ChronoDateTime<Utc>: FromSql<Timestamptz, DB>,
{
    fn from_sql(bytes: DB::RawValue<'_>) -> deserialize::Result<Self> {
        ChronoDateTime::<Utc>::from_sql(bytes).map(DateTime)
    }
}
