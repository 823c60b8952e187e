//! Raffle registry: metadata, slug index, per-owner quota and the inventory
//! store of every raffle.
//!
//! All three indexes live behind one `RwLock`, so the quota check, the slug
//! claim and the inventory bootstrap of a creation happen as one unit, and a
//! deletion removes the raffle, its slug and its 100 tickets as one unit.
//! Per-ticket operations only read-lock the registry long enough to clone the
//! raffle's [`InventoryStore`] handle.

use crate::config::RegistryConfig;
use crate::contact::ContactHandle;
use crate::document::RaffleDocument;
use crate::error::{RaffleError, Result};
use crate::inventory::TicketInventory;
use crate::metrics::RegistryMetrics;
use crate::slug::Slug;
use crate::store::InventoryStore;
use crate::types::{OwnerId, Raffle, RaffleDraft, RaffleId, RafflePatch};
use raffle_core::environment::Clock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

struct RaffleEntry {
    raffle: Raffle,
    inventory: Arc<InventoryStore>,
}

#[derive(Default)]
struct RegistryState {
    raffles: HashMap<RaffleId, RaffleEntry>,
    slugs: HashMap<Slug, RaffleId>,
    owned: HashMap<OwnerId, usize>,
}

impl RegistryState {
    fn entry_owned_by(&mut self, owner: &OwnerId, id: RaffleId) -> Result<&mut RaffleEntry> {
        let entry = self
            .raffles
            .get_mut(&id)
            .ok_or_else(|| RaffleError::raffle_not_found(id))?;
        if &entry.raffle.owner_id != owner {
            return Err(RaffleError::NotOwner { raffle_id: id });
        }
        Ok(entry)
    }

    fn check_quota(&self, owner: &OwnerId, limit: usize) -> Result<()> {
        if self.owned.get(owner).copied().unwrap_or(0) >= limit {
            RegistryMetrics::record_quota_rejection();
            return Err(RaffleError::QuotaExceeded { limit });
        }
        Ok(())
    }

    fn insert(&mut self, raffle: Raffle, inventory: Arc<InventoryStore>) {
        *self.owned.entry(raffle.owner_id.clone()).or_insert(0) += 1;
        self.slugs.insert(raffle.slug.clone(), raffle.id);
        self.raffles.insert(raffle.id, RaffleEntry { raffle, inventory });
    }
}

/// How the slug of a new raffle was chosen
enum SlugRequest {
    /// Picked by the owner; must be free as-is
    Explicit(Slug),
    /// Derived from the title; numbered until free
    Derived(Slug),
}

/// Checked and normalized fields of a [`RaffleDraft`]
struct ValidDraft {
    owner_name: String,
    owner_contact: ContactHandle,
    title: String,
    description: String,
    prize_description: String,
    slug: SlugRequest,
}

/// Registry of every raffle the engine holds
pub struct RaffleRegistry {
    state: RwLock<RegistryState>,
    clock: Arc<dyn Clock>,
    config: RegistryConfig,
}

impl RaffleRegistry {
    /// Creates an empty registry
    #[must_use]
    pub fn new(config: RegistryConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            clock,
            config,
        }
    }

    /// Registry settings
    #[must_use]
    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Creates a raffle with 100 available tickets.
    ///
    /// # Errors
    ///
    /// - [`RaffleError::Validation`] for a blank title or prize, an empty
    ///   contact, or a malformed explicit slug
    /// - [`RaffleError::QuotaExceeded`] if the owner already holds the maximum
    /// - [`RaffleError::DuplicateSlug`] if an explicit slug is taken, or every
    ///   numbered variant of a derived slug that fits `slug_max_len` is taken
    #[tracing::instrument(skip_all, fields(owner = %owner))]
    pub async fn create(&self, owner: &OwnerId, draft: RaffleDraft) -> Result<Raffle> {
        let ticket_price = draft.ticket_price;
        let draft = self.validate_draft(draft)?;

        let mut state = self.state.write().await;
        state.check_quota(owner, self.config.max_raffles_per_owner)?;

        let slug = match draft.slug {
            SlugRequest::Explicit(slug) => {
                if state.slugs.contains_key(&slug) {
                    return Err(RaffleError::DuplicateSlug {
                        slug: slug.to_string(),
                    });
                }
                slug
            }
            SlugRequest::Derived(base) => {
                let mut candidate = base.clone();
                let mut n = 2;
                while state.slugs.contains_key(&candidate) {
                    candidate = base.with_suffix(n, self.config.slug_max_len).ok_or_else(|| {
                        RaffleError::DuplicateSlug {
                            slug: base.to_string(),
                        }
                    })?;
                    n += 1;
                }
                candidate
            }
        };

        let raffle = Raffle {
            id: RaffleId::new(),
            owner_id: owner.clone(),
            owner_name: draft.owner_name,
            owner_contact: draft.owner_contact,
            title: draft.title,
            description: draft.description,
            prize_description: draft.prize_description,
            ticket_price,
            slug,
            is_active: true,
            created_at: self.clock.now(),
        };
        let inventory = Arc::new(InventoryStore::new(
            raffle.id,
            TicketInventory::new(),
            Arc::clone(&self.clock),
        ));
        state.insert(raffle.clone(), inventory);
        RegistryMetrics::record_created(state.raffles.len());

        tracing::info!(raffle_id = %raffle.id, slug = %raffle.slug, "Raffle created");
        Ok(raffle)
    }

    /// Resolves a raffle by id, or by slug when the identifier is not an id.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::RaffleNotFound`] if nothing matches.
    pub async fn get(&self, identifier: &str) -> Result<Raffle> {
        let identifier = identifier.trim();
        let state = self.state.read().await;
        let id = RaffleId::parse(identifier)
            .filter(|id| state.raffles.contains_key(id))
            .or_else(|| state.slugs.get(identifier).copied())
            .ok_or_else(|| RaffleError::raffle_not_found(identifier))?;
        state
            .raffles
            .get(&id)
            .map(|entry| entry.raffle.clone())
            .ok_or_else(|| RaffleError::raffle_not_found(identifier))
    }

    /// Resolves a raffle by id.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::RaffleNotFound`] if the id is unknown.
    pub async fn get_by_id(&self, id: RaffleId) -> Result<Raffle> {
        self.state
            .read()
            .await
            .raffles
            .get(&id)
            .map(|entry| entry.raffle.clone())
            .ok_or_else(|| RaffleError::raffle_not_found(id))
    }

    /// Raffles of one owner, newest first
    pub async fn list_owned(&self, owner: &OwnerId) -> Vec<Raffle> {
        let state = self.state.read().await;
        let mut raffles: Vec<Raffle> = state
            .raffles
            .values()
            .filter(|entry| &entry.raffle.owner_id == owner)
            .map(|entry| entry.raffle.clone())
            .collect();
        raffles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        raffles
    }

    /// Number of raffles held
    pub async fn len(&self) -> usize {
        self.state.read().await.raffles.len()
    }

    /// Whether the registry holds no raffles
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Inventory handle of a raffle, regardless of its active flag
    pub(crate) async fn inventory(&self, id: RaffleId) -> Result<Arc<InventoryStore>> {
        self.state
            .read()
            .await
            .raffles
            .get(&id)
            .map(|entry| Arc::clone(&entry.inventory))
            .ok_or_else(|| RaffleError::raffle_not_found(id))
    }

    /// Inventory handle of a raffle that accepts reservations
    pub(crate) async fn active_inventory(&self, id: RaffleId) -> Result<Arc<InventoryStore>> {
        let state = self.state.read().await;
        let entry = state
            .raffles
            .get(&id)
            .ok_or_else(|| RaffleError::raffle_not_found(id))?;
        if !entry.raffle.is_active {
            return Err(RaffleError::RaffleInactive { raffle_id: id });
        }
        Ok(Arc::clone(&entry.inventory))
    }

    /// Inventory handle of a raffle the caller owns
    pub(crate) async fn owned_inventory(
        &self,
        owner: &OwnerId,
        id: RaffleId,
    ) -> Result<Arc<InventoryStore>> {
        let state = self.state.read().await;
        let entry = state
            .raffles
            .get(&id)
            .ok_or_else(|| RaffleError::raffle_not_found(id))?;
        if &entry.raffle.owner_id != owner {
            return Err(RaffleError::NotOwner { raffle_id: id });
        }
        Ok(Arc::clone(&entry.inventory))
    }

    /// Applies metadata changes.
    ///
    /// # Errors
    ///
    /// - [`RaffleError::RaffleNotFound`] / [`RaffleError::NotOwner`]
    /// - [`RaffleError::Validation`] for blank required fields or a malformed slug
    /// - [`RaffleError::DuplicateSlug`] if the new slug belongs to another raffle
    #[tracing::instrument(skip_all, fields(owner = %owner, raffle_id = %id))]
    pub async fn update(&self, owner: &OwnerId, id: RaffleId, patch: RafflePatch) -> Result<Raffle> {
        let new_slug = patch
            .slug
            .as_deref()
            .map(|raw| Slug::parse(raw, self.config.slug_max_len))
            .transpose()?;
        let new_contact = patch
            .owner_contact
            .as_deref()
            .map(|raw| ContactHandle::normalize(raw, &self.config.default_country_code))
            .transpose()?;
        let new_title = patch.title.as_deref().map(|t| required("title", t)).transpose()?;
        let new_prize = patch
            .prize_description
            .as_deref()
            .map(|p| required("prize description", p))
            .transpose()?;

        let mut state = self.state.write().await;
        state.entry_owned_by(owner, id)?;

        if let Some(slug) = &new_slug {
            if state.slugs.get(slug).is_some_and(|holder| *holder != id) {
                return Err(RaffleError::DuplicateSlug {
                    slug: slug.to_string(),
                });
            }
        }

        let RegistryState { raffles, slugs, .. } = &mut *state;
        let entry = raffles
            .get_mut(&id)
            .ok_or_else(|| RaffleError::raffle_not_found(id))?;
        let raffle = &mut entry.raffle;

        if let Some(slug) = new_slug {
            slugs.remove(&raffle.slug);
            slugs.insert(slug.clone(), id);
            raffle.slug = slug;
        }
        if let Some(contact) = new_contact {
            raffle.owner_contact = contact;
        }
        if let Some(title) = new_title {
            raffle.title = title;
        }
        if let Some(prize) = new_prize {
            raffle.prize_description = prize;
        }
        if let Some(name) = patch.owner_name {
            raffle.owner_name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            raffle.description = description.trim().to_string();
        }
        if let Some(price) = patch.ticket_price {
            raffle.ticket_price = price;
        }

        tracing::info!("Raffle updated");
        Ok(raffle.clone())
    }

    /// Sets the active flag.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::RaffleNotFound`] or [`RaffleError::NotOwner`].
    #[tracing::instrument(skip_all, fields(owner = %owner, raffle_id = %id))]
    pub async fn set_active(&self, owner: &OwnerId, id: RaffleId, active: bool) -> Result<Raffle> {
        let mut state = self.state.write().await;
        let entry = state.entry_owned_by(owner, id)?;
        entry.raffle.is_active = active;
        tracing::info!(active, "Raffle status changed");
        Ok(entry.raffle.clone())
    }

    /// Flips the active flag.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::RaffleNotFound`] or [`RaffleError::NotOwner`].
    pub async fn toggle_active(&self, owner: &OwnerId, id: RaffleId) -> Result<Raffle> {
        let mut state = self.state.write().await;
        let entry = state.entry_owned_by(owner, id)?;
        entry.raffle.is_active = !entry.raffle.is_active;
        tracing::info!(raffle_id = %id, active = entry.raffle.is_active, "Raffle status toggled");
        Ok(entry.raffle.clone())
    }

    /// Deletes a raffle with all its tickets.
    ///
    /// Once this returns, neither the raffle nor any ticket resolves and every
    /// snapshot subscription has ended.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::RaffleNotFound`] or [`RaffleError::NotOwner`].
    #[tracing::instrument(skip_all, fields(owner = %owner, raffle_id = %id))]
    pub async fn delete(&self, owner: &OwnerId, id: RaffleId) -> Result<()> {
        let mut state = self.state.write().await;
        state.entry_owned_by(owner, id)?;
        let Some(entry) = state.raffles.remove(&id) else {
            return Err(RaffleError::raffle_not_found(id));
        };
        state.slugs.remove(&entry.raffle.slug);
        if let Some(count) = state.owned.get_mut(owner) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                state.owned.remove(owner);
            }
        }
        entry.inventory.close().await;
        RegistryMetrics::record_deleted(state.raffles.len());

        tracing::info!("Raffle deleted");
        Ok(())
    }

    /// Adds a raffle from its persisted document.
    ///
    /// # Errors
    ///
    /// - [`RaffleError::Validation`] if the document is malformed or the id is
    ///   already present
    /// - [`RaffleError::QuotaExceeded`] if the owner already holds the maximum
    /// - [`RaffleError::DuplicateSlug`] if the slug is taken
    #[tracing::instrument(skip_all, fields(raffle_id = %document.raffle.id))]
    pub async fn load(&self, document: RaffleDocument) -> Result<Raffle> {
        let (raffle, inventory) = document.into_parts()?;
        Slug::parse(raffle.slug.as_str(), self.config.slug_max_len)?;

        let mut state = self.state.write().await;
        if state.raffles.contains_key(&raffle.id) {
            return Err(RaffleError::Validation(format!(
                "raffle {} is already loaded",
                raffle.id
            )));
        }
        state.check_quota(&raffle.owner_id, self.config.max_raffles_per_owner)?;
        if state.slugs.contains_key(&raffle.slug) {
            return Err(RaffleError::DuplicateSlug {
                slug: raffle.slug.to_string(),
            });
        }

        let store = Arc::new(InventoryStore::new(
            raffle.id,
            inventory,
            Arc::clone(&self.clock),
        ));
        state.insert(raffle.clone(), store);
        RegistryMetrics::record_created(state.raffles.len());

        tracing::info!(slug = %raffle.slug, "Raffle loaded");
        Ok(raffle)
    }

    /// Persisted document of a raffle and its current tickets.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::RaffleNotFound`] if the id is unknown.
    pub async fn export(&self, id: RaffleId) -> Result<RaffleDocument> {
        let (raffle, inventory) = {
            let state = self.state.read().await;
            let entry = state
                .raffles
                .get(&id)
                .ok_or_else(|| RaffleError::raffle_not_found(id))?;
            (entry.raffle.clone(), Arc::clone(&entry.inventory))
        };
        let tickets = inventory.list().await?;
        Ok(RaffleDocument::new(raffle, &tickets))
    }

    fn validate_draft(&self, draft: RaffleDraft) -> Result<ValidDraft> {
        let title = required("title", &draft.title)?;
        let prize_description = required("prize description", &draft.prize_description)?;
        let owner_contact =
            ContactHandle::normalize(&draft.owner_contact, &self.config.default_country_code)?;
        let slug = match draft.slug.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                SlugRequest::Explicit(Slug::parse(raw, self.config.slug_max_len)?)
            }
            _ => SlugRequest::Derived(Slug::derive(&title, self.config.slug_max_len)?),
        };
        Ok(ValidDraft {
            owner_name: draft.owner_name.trim().to_string(),
            owner_contact,
            title,
            description: draft.description.trim().to_string(),
            prize_description,
            slug,
        })
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(RaffleError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}
