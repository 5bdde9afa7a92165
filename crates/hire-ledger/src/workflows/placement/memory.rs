//! In-process storage used by the API binary, the demo and tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::audit::{AuditEntry, AuditError, AuditTrail};
use super::domain::{Candidate, CandidateId, ClientId, ClientTerms, OfferId};
use super::offer::Offer;
use super::repository::{
    LifecycleCommit, OfferWrite, PlacementRepository, RepositoryError, SafetyWrite,
};
use super::safety::SafetyRecord;

#[derive(Debug, Default)]
struct StoreState {
    candidates: HashMap<CandidateId, Candidate>,
    offers: HashMap<OfferId, Offer>,
    clients: HashMap<ClientId, ClientTerms>,
    safety: HashMap<CandidateId, SafetyRecord>,
}

impl StoreState {
    fn active_offer(&self, candidate: &CandidateId) -> Option<&Offer> {
        self.offers
            .values()
            .find(|offer| &offer.candidate_id == candidate && offer.status.is_active())
    }

    fn check(&self, commit: &LifecycleCommit) -> Result<(), RepositoryError> {
        let candidate_id = &commit.candidate.id;
        let stored = self
            .candidates
            .get(candidate_id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.version != commit.expected_version {
            return Err(RepositoryError::PreconditionFailed(format!(
                "candidate {candidate_id} is at version {}, change was based on {}",
                stored.version, commit.expected_version
            )));
        }

        match &commit.offer {
            Some(OfferWrite::Insert(offer)) => {
                if let Some(active) = self.active_offer(&offer.candidate_id) {
                    return Err(RepositoryError::PreconditionFailed(format!(
                        "candidate {} already has active offer {}",
                        offer.candidate_id, active.id
                    )));
                }
                if self.offers.contains_key(&offer.id) {
                    return Err(RepositoryError::Conflict);
                }
            }
            Some(OfferWrite::Update {
                offer,
                expected_status,
            }) => {
                let current = self.offers.get(&offer.id).ok_or(RepositoryError::NotFound)?;
                if current.status != *expected_status {
                    return Err(RepositoryError::PreconditionFailed(format!(
                        "offer {} is {}, expected {}",
                        offer.id, current.status, expected_status
                    )));
                }
            }
            None => {}
        }

        match &commit.safety {
            Some(SafetyWrite::Open(record))
                if self
                    .safety
                    .get(&record.candidate_id)
                    .is_some_and(|existing| !existing.safety_status.is_final()) =>
            {
                Err(RepositoryError::PreconditionFailed(format!(
                    "guarantee record for candidate {} is still open",
                    record.candidate_id
                )))
            }
            Some(SafetyWrite::Update(record)) if !self.safety.contains_key(&record.candidate_id) => {
                Err(RepositoryError::NotFound)
            }
            _ => Ok(()),
        }
    }
}

/// Single-lock store; every commit is checked and applied while holding the lock.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPlacementStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryPlacementStore {
    fn state(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("placement store lock poisoned".to_string()))
    }
}

impl PlacementRepository for InMemoryPlacementStore {
    fn insert_candidate(&self, candidate: Candidate) -> Result<Candidate, RepositoryError> {
        let mut state = self.state()?;
        if state.candidates.contains_key(&candidate.id) {
            return Err(RepositoryError::Conflict);
        }
        state
            .candidates
            .insert(candidate.id.clone(), candidate.clone());
        Ok(candidate)
    }

    fn fetch_candidate(&self, id: &CandidateId) -> Result<Option<Candidate>, RepositoryError> {
        Ok(self.state()?.candidates.get(id).cloned())
    }

    fn fetch_offer(&self, id: &OfferId) -> Result<Option<Offer>, RepositoryError> {
        Ok(self.state()?.offers.get(id).cloned())
    }

    fn active_offer(&self, candidate: &CandidateId) -> Result<Option<Offer>, RepositoryError> {
        Ok(self.state()?.active_offer(candidate).cloned())
    }

    fn offers_for(&self, candidate: &CandidateId) -> Result<Vec<Offer>, RepositoryError> {
        let state = self.state()?;
        let mut offers: Vec<Offer> = state
            .offers
            .values()
            .filter(|offer| &offer.candidate_id == candidate)
            .cloned()
            .collect();
        offers.sort_by(|a, b| a.extended_at.cmp(&b.extended_at).then(a.id.cmp(&b.id)));
        Ok(offers)
    }

    fn upsert_client(&self, client: ClientTerms) -> Result<(), RepositoryError> {
        self.state()?.clients.insert(client.id.clone(), client);
        Ok(())
    }

    fn fetch_client(&self, id: &ClientId) -> Result<Option<ClientTerms>, RepositoryError> {
        Ok(self.state()?.clients.get(id).cloned())
    }

    fn fetch_safety(
        &self,
        candidate: &CandidateId,
    ) -> Result<Option<SafetyRecord>, RepositoryError> {
        Ok(self.state()?.safety.get(candidate).cloned())
    }

    fn open_placements(&self) -> Result<Vec<SafetyRecord>, RepositoryError> {
        let state = self.state()?;
        let mut records: Vec<SafetyRecord> = state
            .safety
            .values()
            .filter(|record| !record.safety_status.is_final())
            .cloned()
            .collect();
        records.sort_by(|a, b| a.candidate_id.cmp(&b.candidate_id));
        Ok(records)
    }

    fn commit(&self, commit: LifecycleCommit) -> Result<Candidate, RepositoryError> {
        let mut state = self.state()?;
        state.check(&commit)?;

        let LifecycleCommit {
            mut candidate,
            expected_version,
            offer,
            safety,
        } = commit;

        candidate.version = expected_version + 1;
        state
            .candidates
            .insert(candidate.id.clone(), candidate.clone());

        match offer {
            Some(OfferWrite::Insert(offer)) | Some(OfferWrite::Update { offer, .. }) => {
                state.offers.insert(offer.id.clone(), offer);
            }
            None => {}
        }

        match safety {
            Some(SafetyWrite::Open(record)) | Some(SafetyWrite::Update(record)) => {
                state.safety.insert(record.candidate_id.clone(), record);
            }
            None => {}
        }

        Ok(candidate)
    }
}

/// Audit trail kept in insertion order.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAuditTrail {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl InMemoryAuditTrail {
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditTrail for InMemoryAuditTrail {
    fn append(&self, entry: AuditEntry) -> Result<(), AuditError> {
        self.entries
            .lock()
            .map_err(|_| AuditError::Unavailable("audit lock poisoned".to_string()))?
            .push(entry);
        Ok(())
    }

    fn entries_for(&self, candidate: &CandidateId) -> Result<Vec<AuditEntry>, AuditError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| AuditError::Unavailable("audit lock poisoned".to_string()))?;
        Ok(entries
            .iter()
            .filter(|entry| entry.candidate_id.as_ref() == Some(candidate))
            .cloned()
            .collect())
    }
}
