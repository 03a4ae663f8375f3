//! Raffle (sorteio) Aggregate

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;
use crate::domain::events::{DomainEvent, RaffleEvent};
use crate::domain::value_objects::WhatsAppNumber;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Raffle {
    id: String,
    title: String,
    description: String,
    prize: String,
    image_url: Option<String>,
    draw_date: Option<DateTime<Utc>>,
    status: RaffleStatus,
    entries: Vec<RaffleEntry>,
    winner: Option<RaffleEntry>,
    created_at: DateTime<Utc>,
    drawn_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaffleEntry {
    pub id: String,
    pub name: String,
    pub phone: WhatsAppNumber,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaffleStatus { #[default] Open, Closed, Drawn }

#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct RaffleInput {
    #[validate(length(min = 1, max = 160, message = "title is required"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, message = "prize is required"))]
    pub prize: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub draw_date: Option<DateTime<Utc>>,
}

/// Public view: entries are reduced to a count so phone numbers never leave the admin.
#[derive(Clone, Debug, Serialize)]
pub struct RaffleSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub prize: String,
    pub image_url: Option<String>,
    pub draw_date: Option<DateTime<Utc>>,
    pub status: RaffleStatus,
    pub entries: usize,
    pub winner_name: Option<String>,
}

impl Raffle {
    pub fn create(input: &RaffleInput) -> Result<Self, RaffleError> {
        input.validate().map_err(|e| RaffleError::Invalid(e.to_string()))?;
        Ok(Self {
            id: Uuid::now_v7().to_string(), title: input.title.trim().to_string(),
            description: input.description.clone(), prize: input.prize.trim().to_string(),
            image_url: input.image_url.clone(), draw_date: input.draw_date, status: RaffleStatus::Open,
            entries: vec![], winner: None, created_at: Utc::now(), drawn_at: None, events: vec![],
        })
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn status(&self) -> RaffleStatus { self.status }
    pub fn entries(&self) -> &[RaffleEntry] { &self.entries }
    pub fn winner(&self) -> Option<&RaffleEntry> { self.winner.as_ref() }

    pub fn summary(&self) -> RaffleSummary {
        RaffleSummary {
            id: self.id.clone(), title: self.title.clone(), description: self.description.clone(),
            prize: self.prize.clone(), image_url: self.image_url.clone(), draw_date: self.draw_date,
            status: self.status, entries: self.entries.len(), winner_name: self.winner.as_ref().map(|w| w.name.clone()),
        }
    }

    /// One entry per phone number, only while the raffle is open.
    pub fn enter(&mut self, name: &str, phone: &str) -> Result<&RaffleEntry, RaffleError> {
        if self.status != RaffleStatus::Open { return Err(RaffleError::NotOpen); }
        let name = name.trim();
        if name.is_empty() { return Err(RaffleError::Invalid("name is required".into())); }
        let phone = WhatsAppNumber::new(phone).map_err(|e| RaffleError::Invalid(e.to_string()))?;
        if self.entries.iter().any(|e| e.phone == phone) { return Err(RaffleError::DuplicateEntry); }
        self.entries.push(RaffleEntry { id: Uuid::now_v7().to_string(), name: name.to_string(), phone, created_at: Utc::now() });
        self.raise_event(DomainEvent::Raffle(RaffleEvent::EntryAdded { raffle_id: self.id.clone(), entries: self.entries.len() }));
        self.entries.last().ok_or(RaffleError::NoEntries)
    }

    pub fn close(&mut self) -> Result<(), RaffleError> {
        match self.status {
            RaffleStatus::Open => { self.status = RaffleStatus::Closed; Ok(()) }
            RaffleStatus::Closed => Ok(()),
            RaffleStatus::Drawn => Err(RaffleError::AlreadyDrawn),
        }
    }

    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<&RaffleEntry, RaffleError> {
        if self.status == RaffleStatus::Drawn { return Err(RaffleError::AlreadyDrawn); }
        if self.entries.is_empty() { return Err(RaffleError::NoEntries); }
        let idx = rng.gen_range(0..self.entries.len());
        let winner = self.entries[idx].clone();
        self.raise_event(DomainEvent::Raffle(RaffleEvent::Drawn { raffle_id: self.id.clone(), winner_entry_id: winner.id.clone() }));
        self.status = RaffleStatus::Drawn;
        self.drawn_at = Some(Utc::now());
        Ok(self.winner.insert(winner))
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RaffleError {
    #[error("Raffle is not open for entries")]
    NotOpen,
    #[error("This phone number is already entered")]
    DuplicateEntry,
    #[error("Raffle has no entries")]
    NoEntries,
    #[error("Raffle was already drawn")]
    AlreadyDrawn,
    #[error("Invalid raffle: {0}")]
    Invalid(String),
}
