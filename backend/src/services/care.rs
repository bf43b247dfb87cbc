//! Feeding, interactions and the item shop.

use chrono::Utc;
use serde::Serialize;
use std::str::FromStr;
use tracing::info;

use super::engine::{require, spend, EngineError, EngineResult, PetEngine};
use crate::api::{ItemId, PetId, UserId};
use crate::models::catalog::{self, ItemDef, ItemKind};
use crate::models::ledger::TransactionKind;
use crate::models::pet::{InventoryEntry, MetricDelta, MetricsView, PetRecord, PetView};
use crate::realtime::MessageType;
use crate::services::metrics;

const FEED_XP: u64 = 2;
const PET_XP: u64 = 1;
const PLAY_XP: u64 = 2;
const PLAY_ENERGY_COST: f64 = 15.0;

/// Direct interactions with a pet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Interaction {
    Pet,
    Play,
    Sleep,
    Wake,
}

impl Interaction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pet => "pet",
            Self::Play => "play",
            Self::Sleep => "sleep",
            Self::Wake => "wake",
        }
    }

    fn animation(&self) -> &'static str {
        match self {
            Self::Pet => "purr",
            Self::Play => "play",
            Self::Sleep => "sleep",
            Self::Wake => "wake",
        }
    }
}

impl FromStr for Interaction {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pet" => Ok(Self::Pet),
            "play" => Ok(Self::Play),
            "sleep" => Ok(Self::Sleep),
            "wake" => Ok(Self::Wake),
            other => Err(EngineError::Validation(format!("Invalid action: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedOutcome {
    pub success: bool,
    pub message: String,
    pub new_metrics: MetricsView,
    pub cost: i64,
    pub version: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractionOutcome {
    pub success: bool,
    pub action: Interaction,
    pub message: String,
    pub effect: MetricDelta,
    pub animation: &'static str,
    pub pet: PetView,
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryItem {
    pub item: ItemDef,
    pub quantity: u32,
    pub total_used: u32,
    pub last_used_at: Option<chrono::DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseOutcome {
    pub item_id: ItemId,
    pub quantity: u32,
    pub total_cost: i64,
    pub remaining_currency: i64,
    pub owned: u32,
    pub version: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UseOutcome {
    pub item_id: ItemId,
    pub effect: MetricDelta,
    pub remaining: u32,
    pub pet: PetView,
}

fn ensure_awake(pet: &PetRecord, what: &str) -> EngineResult<()> {
    if pet.is_sleeping {
        return Err(EngineError::Conflict(format!(
            "{} is sleeping and cannot {what} right now",
            pet.name
        )));
    }
    Ok(())
}

impl PetEngine {
    /// Buy `food_slug` with pet currency and feed it immediately.
    pub async fn feed(
        &self,
        user_id: UserId,
        pet_id: PetId,
        food_slug: &str,
        expected_version: Option<u64>,
    ) -> EngineResult<FeedOutcome> {
        let food = catalog::find_item_by_slug(food_slug)
            .filter(|item| item.kind == ItemKind::Food)
            .ok_or_else(|| EngineError::Validation(format!("Unknown food: {food_slug}")))?;

        let committed = self
            .mutate_pet(pet_id, user_id, expected_version, |pet| {
                require(pet, user_id, |p| p.can_feed, "feed")?;
                require(pet, user_id, |p| p.can_spend_currency, "spend currency on")?;
                ensure_awake(pet, "eat")?;
                spend(pet, food.cost)?;
                let applied = metrics::apply_delta(&mut pet.metrics, &food.effects);
                pet.gain_experience(FEED_XP);
                pet.last_fed_at = Some(Utc::now());
                super::engine::ownership_mut(pet, user_id)?.stats.total_feeds += 1;
                Ok(applied)
            })
            .await?;
        let pet = &committed.pet;
        info!(pet_id = %pet_id, user_id = %user_id, food = food.slug, "Pet fed");

        self.record_transaction(
            pet,
            user_id,
            -food.cost,
            TransactionKind::ItemPurchase,
            format!("Fed {} to {}", food.name, pet.name),
            None,
            Some(food.id),
        )
        .await;
        self.record_snapshot(pet, "fed", Some(food.slug.to_string())).await;
        self.record_activity(
            pet,
            user_id,
            "fed",
            serde_json::json!({ "food": food.slug, "cost": food.cost }),
            committed.value.clone(),
        )
        .await;
        self.broadcast(
            pet,
            MessageType::PetFeed,
            serde_json::json!({
                "user_id": user_id,
                "food": food.slug,
                "effect": committed.value,
            }),
        );
        self.publish(&committed);
        self.evaluate_achievements(user_id, pet_id).await;

        Ok(FeedOutcome {
            success: true,
            message: format!("{} enjoyed the {}!", pet.name, food.name),
            new_metrics: pet.metrics.view(),
            cost: food.cost,
            version: pet.version,
        })
    }

    pub async fn interact(
        &self,
        user_id: UserId,
        pet_id: PetId,
        action: Interaction,
        expected_version: Option<u64>,
    ) -> EngineResult<InteractionOutcome> {
        let committed = self
            .mutate_pet(pet_id, user_id, expected_version, |pet| {
                let now = Utc::now();
                match action {
                    Interaction::Pet => {
                        let applied =
                            metrics::apply_delta(&mut pet.metrics, &MetricDelta::default().happiness(5.0));
                        pet.gain_experience(PET_XP);
                        pet.times_petted.click();
                        pet.last_petted_at = Some(now);
                        super::engine::ownership_mut(pet, user_id)?.stats.total_pets += 1;
                        Ok(applied)
                    }
                    Interaction::Play => {
                        require(pet, user_id, |p| p.can_play, "play with")?;
                        ensure_awake(pet, "play")?;
                        if pet.metrics.energy < PLAY_ENERGY_COST {
                            return Err(EngineError::Conflict(format!(
                                "{} is too tired to play",
                                pet.name
                            )));
                        }
                        let applied = metrics::apply_delta(
                            &mut pet.metrics,
                            &MetricDelta::default()
                                .happiness(10.0)
                                .energy(-PLAY_ENERGY_COST),
                        );
                        pet.gain_experience(PLAY_XP);
                        pet.last_played_at = Some(now);
                        super::engine::ownership_mut(pet, user_id)?.stats.total_plays += 1;
                        Ok(applied)
                    }
                    Interaction::Sleep => {
                        if pet.is_sleeping {
                            return Err(EngineError::Conflict(format!(
                                "{} is already sleeping",
                                pet.name
                            )));
                        }
                        pet.is_sleeping = true;
                        Ok(metrics::apply_delta(
                            &mut pet.metrics,
                            &MetricDelta::default().energy(50.0),
                        ))
                    }
                    Interaction::Wake => {
                        if !pet.is_sleeping {
                            return Err(EngineError::Conflict(format!(
                                "{} is not sleeping",
                                pet.name
                            )));
                        }
                        pet.is_sleeping = false;
                        Ok(MetricDelta::default())
                    }
                }
            })
            .await?;
        let pet = &committed.pet;
        let message = match action {
            Interaction::Pet => format!("{} purrs happily!", pet.name),
            Interaction::Play => format!("{} had fun playing!", pet.name),
            Interaction::Sleep => format!("{} curled up for a nap", pet.name),
            Interaction::Wake => format!("{} woke up", pet.name),
        };

        self.record_snapshot(pet, action.as_str(), None).await;
        self.record_activity(
            pet,
            user_id,
            action.as_str(),
            serde_json::json!({ "action": action }),
            committed.value.clone(),
        )
        .await;
        self.broadcast(
            pet,
            MessageType::PetInteraction,
            serde_json::json!({
                "user_id": user_id,
                "action": action,
                "effect": committed.value,
                "times_petted": pet.times_petted.count(),
            }),
        );
        if action == Interaction::Play {
            self.broadcast(pet, MessageType::PetPlay, serde_json::json!({ "user_id": user_id }));
        }
        self.publish(&committed);
        self.evaluate_achievements(user_id, pet_id).await;

        Ok(InteractionOutcome {
            success: true,
            action,
            message,
            effect: committed.value.clone(),
            animation: action.animation(),
            pet: pet.view(),
        })
    }

    /// Buy `quantity` of an item into the pet inventory.
    pub async fn purchase_item(
        &self,
        user_id: UserId,
        pet_id: PetId,
        item_id: ItemId,
        quantity: u32,
        expected_version: Option<u64>,
    ) -> EngineResult<PurchaseOutcome> {
        let item = catalog::find_item(item_id)
            .ok_or_else(|| EngineError::NotFound("Item".to_string()))?;
        if quantity == 0 {
            return Err(EngineError::Validation("Quantity must be at least 1".to_string()));
        }
        let total_cost = item.cost * i64::from(quantity);

        let committed = self
            .mutate_pet(pet_id, user_id, expected_version, |pet| {
                require(pet, user_id, |p| p.can_spend_currency, "spend currency on")?;
                if pet.level < item.unlock_level {
                    return Err(EngineError::Forbidden(format!(
                        "{} unlocks at level {}",
                        item.name, item.unlock_level
                    )));
                }
                let owned = pet.inventory_entry(item.id).map_or(0, |e| e.quantity);
                if quantity > item.max_stack.saturating_sub(owned) {
                    return Err(EngineError::Validation(format!(
                        "Cannot hold more than {} {}",
                        item.max_stack, item.name
                    )));
                }
                spend(pet, total_cost)?;
                let now = Utc::now();
                match pet.inventory.iter_mut().find(|e| e.item_id == item.id) {
                    Some(entry) => entry.quantity += quantity,
                    None => pet.inventory.push(InventoryEntry {
                        item_id: item.id,
                        quantity,
                        total_used: 0,
                        last_used_at: None,
                        acquired_at: now,
                    }),
                }
                Ok(owned + quantity)
            })
            .await?;
        let pet = &committed.pet;

        self.record_transaction(
            pet,
            user_id,
            -total_cost,
            TransactionKind::ItemPurchase,
            format!("Purchased {quantity} x {}", item.name),
            None,
            Some(item.id),
        )
        .await;
        self.record_activity(
            pet,
            user_id,
            "purchase",
            serde_json::json!({ "item": item.slug, "quantity": quantity, "cost": total_cost }),
            MetricDelta::default(),
        )
        .await;
        self.publish(&committed);

        Ok(PurchaseOutcome {
            item_id,
            quantity,
            total_cost,
            remaining_currency: pet.metrics.currency,
            owned: committed.value,
            version: pet.version,
        })
    }

    /// Use one owned item. Durable items stay in the inventory.
    pub async fn use_item(
        &self,
        user_id: UserId,
        pet_id: PetId,
        item_id: ItemId,
        expected_version: Option<u64>,
    ) -> EngineResult<UseOutcome> {
        let item = catalog::find_item(item_id)
            .ok_or_else(|| EngineError::NotFound("Item".to_string()))?;

        let committed = self
            .mutate_pet(pet_id, user_id, expected_version, |pet| {
                let now = Utc::now();
                let entry = pet
                    .inventory
                    .iter_mut()
                    .find(|e| e.item_id == item.id && e.quantity > 0)
                    .ok_or_else(|| EngineError::Validation(format!("You do not own any {}", item.name)))?;
                if item.consumable {
                    entry.quantity -= 1;
                }
                entry.total_used += 1;
                entry.last_used_at = Some(now);
                let remaining = entry.quantity;
                pet.inventory.retain(|e| e.quantity > 0);

                let applied = metrics::apply_delta(&mut pet.metrics, &item.effects);
                if item.kind == ItemKind::Food {
                    pet.last_fed_at = Some(now);
                }
                if item.kind == ItemKind::Toy {
                    pet.last_played_at = Some(now);
                }
                Ok((applied, remaining))
            })
            .await?;
        let pet = &committed.pet;
        let (applied, remaining) = committed.value.clone();

        self.record_snapshot(pet, "item_used", Some(item.slug.to_string())).await;
        self.record_activity(
            pet,
            user_id,
            "item_used",
            serde_json::json!({ "item": item.slug }),
            applied.clone(),
        )
        .await;
        self.publish(&committed);

        Ok(UseOutcome {
            item_id,
            effect: applied,
            remaining,
            pet: pet.view(),
        })
    }

    pub async fn inventory(&self, user_id: UserId, pet_id: PetId) -> EngineResult<Vec<InventoryItem>> {
        let pet = self.load_for_member(pet_id, user_id).await?;
        Ok(pet
            .inventory
            .iter()
            .filter_map(|entry| {
                catalog::find_item(entry.item_id).map(|item| InventoryItem {
                    item,
                    quantity: entry.quantity,
                    total_used: entry.total_used,
                    last_used_at: entry.last_used_at,
                })
            })
            .collect())
    }
}
