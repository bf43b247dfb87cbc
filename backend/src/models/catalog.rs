//! Built-in item and achievement catalog.
//!
//! These definitions are the seed data every deployment starts with. They are
//! static, so lookups never touch the repository.

use serde::{Deserialize, Serialize};

use crate::api::ItemId;
use crate::models::pet::MetricDelta;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Food,
    Toy,
    Accessory,
    Medicine,
    Special,
}

/// An item that can be bought with pet currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemDef {
    pub id: ItemId,
    pub slug: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ItemKind,
    pub cost: i64,
    pub effects: MetricDelta,
    /// Consumable items are used up; durable items stay in the inventory.
    pub consumable: bool,
    pub max_stack: u32,
    pub unlock_level: u32,
    pub icon_url: &'static str,
}

/// What an achievement counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    Feeds,
    Pets,
    TasksCompleted,
    StreakDays,
    CoOwners,
    UniqueCoOwners,
    DaysAlive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AchievementDef {
    pub id: i64,
    pub name: &'static str,
    pub description: &'static str,
    pub requirement: Requirement,
    pub threshold: u64,
    pub currency_reward: i64,
    pub experience_reward: u64,
    pub rarity: Rarity,
}

#[allow(clippy::too_many_arguments)]
fn item(
    id: i64,
    slug: &'static str,
    name: &'static str,
    description: &'static str,
    kind: ItemKind,
    cost: i64,
    effects: MetricDelta,
    consumable: bool,
    unlock_level: u32,
) -> ItemDef {
    ItemDef {
        id: ItemId::new(id),
        slug,
        name,
        description,
        kind,
        cost,
        effects,
        consumable,
        max_stack: 99,
        unlock_level,
        icon_url: match slug {
            "catnip" => "/items/catnip.png",
            "tuna-treat" => "/items/tuna.png",
            "milk-bowl" => "/items/milk.png",
            "yarn-ball" => "/items/yarn.png",
            "feather-wand" => "/items/feather.png",
            "health-potion" => "/items/health_potion.png",
            "energy-drink" => "/items/energy_drink.png",
            _ => "/items/bowtie.png",
        },
    }
}

/// All purchasable items, ordered by id.
pub fn items() -> Vec<ItemDef> {
    vec![
        item(
            1,
            "catnip",
            "Catnip",
            "A classic treat that makes your cat happy",
            ItemKind::Food,
            10,
            MetricDelta::default().happiness(20.0).hunger(-30.0).energy(10.0),
            true,
            1,
        ),
        item(
            2,
            "tuna-treat",
            "Tuna Treat",
            "Delicious tuna that satisfies hunger",
            ItemKind::Food,
            15,
            MetricDelta::default().happiness(15.0).hunger(-40.0).health(5.0),
            true,
            1,
        ),
        item(
            3,
            "milk-bowl",
            "Milk Bowl",
            "Fresh milk for your thirsty cat",
            ItemKind::Food,
            5,
            MetricDelta::default().happiness(10.0).hunger(-20.0).energy(5.0),
            true,
            1,
        ),
        item(
            4,
            "yarn-ball",
            "Yarn Ball",
            "A fun toy to play with",
            ItemKind::Toy,
            20,
            MetricDelta::default().happiness(25.0).energy(-15.0),
            false,
            1,
        ),
        item(
            5,
            "feather-wand",
            "Feather Wand",
            "Interactive toy for playtime",
            ItemKind::Toy,
            25,
            MetricDelta::default().happiness(30.0).energy(-20.0),
            false,
            1,
        ),
        item(
            6,
            "health-potion",
            "Health Potion",
            "Restores your cat's health",
            ItemKind::Medicine,
            30,
            MetricDelta::default().health(50.0),
            true,
            1,
        ),
        item(
            7,
            "energy-drink",
            "Energy Drink",
            "Boosts your cat's energy",
            ItemKind::Medicine,
            25,
            MetricDelta::default().energy(40.0),
            true,
            1,
        ),
        item(
            8,
            "bow-tie",
            "Bow Tie",
            "A stylish accessory for your cat",
            ItemKind::Accessory,
            50,
            MetricDelta::default().happiness(5.0),
            false,
            3,
        ),
    ]
}

/// Find an item by numeric id.
pub fn find_item(id: ItemId) -> Option<ItemDef> {
    items().into_iter().find(|i| i.id == id)
}

/// Find an item by slug or display name, case-insensitively.
pub fn find_item_by_slug(slug: &str) -> Option<ItemDef> {
    let wanted = slug.trim().to_lowercase();
    items()
        .into_iter()
        .find(|i| i.slug == wanted || i.name.to_lowercase() == wanted)
}

#[allow(clippy::too_many_arguments)]
fn achievement(
    id: i64,
    name: &'static str,
    description: &'static str,
    requirement: Requirement,
    threshold: u64,
    currency_reward: i64,
    experience_reward: u64,
    rarity: Rarity,
) -> AchievementDef {
    AchievementDef {
        id,
        name,
        description,
        requirement,
        threshold,
        currency_reward,
        experience_reward,
        rarity,
    }
}

/// All achievements, ordered by id.
pub fn achievements() -> Vec<AchievementDef> {
    use Rarity::*;
    use Requirement::*;
    vec![
        achievement(1, "First Feed", "Feed your pet for the first time", Feeds, 1, 10, 5, Common),
        achievement(2, "Caring Owner", "Feed your pet 100 times", Feeds, 100, 100, 50, Rare),
        achievement(3, "Pet Whisperer", "Pet your cat 50 times", Pets, 50, 50, 25, Common),
        achievement(4, "Task Master", "Complete 10 tasks", TasksCompleted, 10, 50, 25, Common),
        achievement(5, "Productivity Pro", "Complete 100 tasks", TasksCompleted, 100, 200, 100, Epic),
        achievement(6, "Streak Champion", "Maintain a 7-day task streak", StreakDays, 7, 100, 50, Rare),
        achievement(7, "Team Player", "Share your pet with another user", CoOwners, 1, 30, 15, Common),
        achievement(8, "Social Butterfly", "Share pets with 5 different users", UniqueCoOwners, 5, 150, 75, Epic),
        achievement(9, "Week One", "Keep your pet alive for 7 days", DaysAlive, 7, 100, 50, Common),
        achievement(10, "Monthly Milestone", "Keep your pet alive for 30 days", DaysAlive, 30, 500, 250, Legendary),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_ids_are_unique_and_ordered() {
        let ids: Vec<i64> = items().iter().map(|i| i.id.value()).collect();
        assert_eq!(ids, (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn test_find_item_by_slug_or_name() {
        assert_eq!(find_item_by_slug("catnip").unwrap().cost, 10);
        assert_eq!(find_item_by_slug("Tuna Treat").unwrap().slug, "tuna-treat");
        assert_eq!(find_item_by_slug("  MILK-BOWL ").unwrap().cost, 5);
        assert!(find_item_by_slug("lasagna").is_none());
    }

    #[test]
    fn test_food_lowers_hunger() {
        for food in items().into_iter().filter(|i| i.kind == ItemKind::Food) {
            assert!(food.effects.hunger.unwrap() < 0.0, "{} should feed", food.name);
            assert!(food.consumable);
        }
    }

    #[test]
    fn test_bow_tie_is_level_gated() {
        let tie = find_item(ItemId::new(8)).unwrap();
        assert_eq!(tie.unlock_level, 3);
        assert!(!tie.consumable);
    }

    #[test]
    fn test_achievement_thresholds_positive() {
        for a in achievements() {
            assert!(a.threshold > 0);
        }
        assert_eq!(achievements().len(), 10);
    }
}
