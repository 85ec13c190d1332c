//! Interfaces to the services the engine consumes but does not own, with
//! static implementations for the runner binary and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::common::{CalendarId, ElectionId, MajorityRule, Percentage, WindowPosition};

/// Eligibility / roll service.
#[async_trait]
pub trait EligibilityRoll: Send + Sync {
    async fn eligible_voter_count(&self, region: &str, calendar_id: CalendarId) -> Result<u64>;
}

/// Election-parameters service.
#[async_trait]
pub trait ElectionParameters: Send + Sync {
    async fn quorum_threshold(&self, election_id: ElectionId) -> Result<Percentage>;

    async fn majority_rule(&self, election_id: ElectionId) -> Result<MajorityRule>;
}

/// Calendar / temporal-window validator.
#[async_trait]
pub trait VotingCalendar: Send + Sync {
    /// Where `at` falls relative to the region's voting window.
    async fn window_position(
        &self,
        calendar_id: CalendarId,
        region: &str,
        at: DateTime<Utc>,
    ) -> Result<WindowPosition>;

    async fn is_within_voting_window(&self, calendar_id: CalendarId, region: &str) -> Result<bool> {
        let position = self.window_position(calendar_id, region, Utc::now()).await?;
        Ok(position == WindowPosition::Within)
    }
}

/// Fixed eligible-voter counts per region.
#[derive(Debug, Clone, Default)]
pub struct StaticRoll {
    counts: HashMap<String, u64>,
}

impl StaticRoll {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region: impl Into<String>, eligible: u64) -> Self {
        self.counts.insert(region.into(), eligible);
        self
    }
}

#[async_trait]
impl EligibilityRoll for StaticRoll {
    async fn eligible_voter_count(&self, region: &str, calendar_id: CalendarId) -> Result<u64> {
        self.counts.get(region).copied().ok_or_else(|| {
            Error::collaborator(
                "eligibility roll",
                format!("no roll for region {region} in calendar {calendar_id}"),
            )
        })
    }
}

/// The same quorum threshold and majority rule for every election, unless
/// overridden.
#[derive(Debug, Clone)]
pub struct StaticParameters {
    quorum_threshold: Percentage,
    majority_rule: MajorityRule,
    overrides: HashMap<ElectionId, (Percentage, MajorityRule)>,
}

impl StaticParameters {
    pub fn new(quorum_threshold: Percentage, majority_rule: MajorityRule) -> Self {
        Self {
            quorum_threshold,
            majority_rule,
            overrides: HashMap::new(),
        }
    }

    pub fn with_election(
        mut self,
        election_id: ElectionId,
        quorum_threshold: Percentage,
        majority_rule: MajorityRule,
    ) -> Self {
        self.overrides
            .insert(election_id, (quorum_threshold, majority_rule));
        self
    }

    fn get(&self, election_id: ElectionId) -> (Percentage, MajorityRule) {
        self.overrides
            .get(&election_id)
            .copied()
            .unwrap_or((self.quorum_threshold, self.majority_rule))
    }
}

#[async_trait]
impl ElectionParameters for StaticParameters {
    async fn quorum_threshold(&self, election_id: ElectionId) -> Result<Percentage> {
        Ok(self.get(election_id).0)
    }

    async fn majority_rule(&self, election_id: ElectionId) -> Result<MajorityRule> {
        Ok(self.get(election_id).1)
    }
}

/// Fixed voting windows per (calendar, region). Regions without a window are
/// always open for closing.
#[derive(Debug, Clone, Default)]
pub struct StaticCalendar {
    windows: HashMap<(CalendarId, String), (DateTime<Utc>, DateTime<Utc>)>,
}

impl StaticCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(
        mut self,
        calendar_id: CalendarId,
        region: impl Into<String>,
        opens: DateTime<Utc>,
        closes: DateTime<Utc>,
    ) -> Self {
        self.windows
            .insert((calendar_id, region.into()), (opens, closes));
        self
    }
}

#[async_trait]
impl VotingCalendar for StaticCalendar {
    async fn window_position(
        &self,
        calendar_id: CalendarId,
        region: &str,
        at: DateTime<Utc>,
    ) -> Result<WindowPosition> {
        let position = match self.windows.get(&(calendar_id, region.to_string())) {
            None => WindowPosition::Within,
            Some((opens, _)) if at < *opens => WindowPosition::Before,
            Some((_, closes)) if at >= *closes => WindowPosition::After,
            Some(_) => WindowPosition::Within,
        };
        Ok(position)
    }
}
