// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-barbot project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Device register map for the bartending robot
//!
//! Every domain concept (ingredients, cocktails, control signals) maps to a
//! Modbus coil address. All variables are plain coils on the robot controller,
//! read with Read Coils and written with Write Single Coil.
//!
//! ## Coil Map
//!
//! - 32..=43: ingredient in-progress flags (robot output, 32..=41 form the
//!   snapshot step block)
//! - 90: cup holder, 91: drink ready, 92: waiting recipe
//! - 96: start signal
//! - 100..=107: cocktail triggers (107 = custom drink)
//! - 132..=143: ingredient command writes, parallel to the 32..=43 flags

use serde::Serialize;

/// First coil of the batched step-flag read block.
pub const STEP_FLAGS_START: u16 = 32;
/// Number of coils in the step-flag block (addresses 32..=41).
pub const STEP_FLAGS_COUNT: u16 = 10;

/// First coil of the batched system-flag read block.
pub const SYSTEM_FLAGS_START: u16 = 90;
/// Number of coils in the system-flag block (cup holder, drink ready, waiting recipe).
pub const SYSTEM_FLAGS_COUNT: u16 = 3;

/// Coil reporting that a cup sits in the holder.
pub const CUP_HOLDER_ADDRESS: u16 = 90;
/// Coil raised by the robot when the drink is finished.
pub const DRINK_READY_ADDRESS: u16 = 91;
/// Coil raised by the robot when it is idle and accepts a new order.
pub const WAITING_RECIPE_ADDRESS: u16 = 92;

/// Writing `true` here tells the robot to begin the loaded recipe.
pub const START_SIGNAL_ADDRESS: u16 = 96;

/// First cocktail trigger coil.
pub const COCKTAIL_TRIGGER_START: u16 = 100;
/// Number of cocktail trigger coils (100..=107).
pub const COCKTAIL_TRIGGER_COUNT: u16 = 8;
/// Shared trigger coil for custom drinks.
pub const CUSTOM_TRIGGER_ADDRESS: u16 = 107;

/// Identifier used for custom drinks everywhere a cocktail id is expected.
pub const CUSTOM_COCKTAIL_ID: &str = "custom";

/// Semantic keys of the robot state snapshot.
///
/// The first ten map to the step-flag block (32..=41), the last three to the
/// system-flag block (90..=92). Stirring and straw commands exist on the wire
/// but have no snapshot flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StateKey {
    Mint,
    Muddling,
    Ice,
    Syrup,
    Lime,
    WhiteRum,
    Cognac,
    Whiskey,
    Soda,
    Coke,
    CupHolder,
    DrinkReady,
    WaitingRecipe,
}

/// A single dispensable ingredient (or auxiliary action) of the robot.
#[derive(Debug, Clone, Copy)]
pub struct Ingredient {
    /// Stable identifier used by the HTTP API.
    pub id: &'static str,
    /// Human readable label for diagnostics.
    pub label: &'static str,
    /// Snapshot flag raised while the robot performs this step, if observable.
    pub state_key: Option<StateKey>,
    /// Coil the robot raises while performing the step.
    pub read_address: u16,
    /// Coil the server writes to request the step.
    pub write_address: u16,
}

/// A predefined cocktail with a dedicated trigger coil.
#[derive(Debug, Clone, Copy)]
pub struct Cocktail {
    pub id: &'static str,
    pub name: &'static str,
    /// Trigger coil in the 100..=107 block.
    pub trigger_address: u16,
    /// Ingredient command coils in robot execution order.
    pub recipe: &'static [u16],
    /// Observable steps in execution order, terminated by `DrinkReady`.
    pub steps: &'static [StateKey],
}

/// A custom drink synthesized from a caller supplied ingredient selection.
#[derive(Debug, Clone)]
pub struct CustomOrder {
    /// Ingredient command coils in execution order, including implied
    /// muddling/stirring/straw writes.
    pub recipe: Vec<u16>,
    /// Observable steps sorted by read address, terminated by `DrinkReady`.
    pub steps: Vec<StateKey>,
}

/// All ingredients known to the robot, ordered by read address.
pub const INGREDIENTS: &[Ingredient] = &[
    Ingredient {
        id: "mint",
        label: "Placing Mint",
        state_key: Some(StateKey::Mint),
        read_address: 32,
        write_address: 132,
    },
    Ingredient {
        id: "muddling",
        label: "Muddling",
        state_key: Some(StateKey::Muddling),
        read_address: 33,
        write_address: 133,
    },
    Ingredient {
        id: "ice",
        label: "Adding Ice",
        state_key: Some(StateKey::Ice),
        read_address: 34,
        write_address: 134,
    },
    Ingredient {
        id: "syrup",
        label: "Pouring Syrup",
        state_key: Some(StateKey::Syrup),
        read_address: 35,
        write_address: 135,
    },
    Ingredient {
        id: "lime",
        label: "Adding Lime",
        state_key: Some(StateKey::Lime),
        read_address: 36,
        write_address: 136,
    },
    Ingredient {
        id: "white-rum",
        label: "Pouring White Rum",
        state_key: Some(StateKey::WhiteRum),
        read_address: 37,
        write_address: 137,
    },
    Ingredient {
        id: "cognac",
        label: "Pouring Cognac",
        state_key: Some(StateKey::Cognac),
        read_address: 38,
        write_address: 138,
    },
    Ingredient {
        id: "whiskey",
        label: "Pouring Whiskey",
        state_key: Some(StateKey::Whiskey),
        read_address: 39,
        write_address: 139,
    },
    Ingredient {
        id: "soda",
        label: "Adding Soda",
        state_key: Some(StateKey::Soda),
        read_address: 40,
        write_address: 140,
    },
    Ingredient {
        id: "coke",
        label: "Adding Coke",
        state_key: Some(StateKey::Coke),
        read_address: 41,
        write_address: 141,
    },
    // Stirring and straw are write-only auxiliaries: their in-progress flags
    // sit outside the snapshot step block.
    Ingredient {
        id: "stirring",
        label: "Stirring",
        state_key: None,
        read_address: 42,
        write_address: 142,
    },
    Ingredient {
        id: "straw",
        label: "Adding Straw",
        state_key: None,
        read_address: 43,
        write_address: 143,
    },
];

/// Muddling is implied whenever mint is part of a custom selection.
const MUDDLING_WRITE_ADDRESS: u16 = 133;
/// Stirring and straw are implied whenever a mixer (soda/coke) is selected.
const STIRRING_WRITE_ADDRESS: u16 = 142;
const STRAW_WRITE_ADDRESS: u16 = 143;

/// The predefined cocktail menu.
///
/// Recipe order is the robot execution order, not the menu order.
pub const COCKTAILS: &[Cocktail] = &[
    Cocktail {
        id: "mojito",
        name: "Mojito",
        trigger_address: 100,
        recipe: &[132, 133, 135, 136, 134, 137, 140, 142, 143],
        steps: &[
            StateKey::Mint,
            StateKey::Muddling,
            StateKey::Ice,
            StateKey::Syrup,
            StateKey::Lime,
            StateKey::WhiteRum,
            StateKey::Soda,
            StateKey::DrinkReady,
        ],
    },
    Cocktail {
        id: "cuba-libre",
        name: "Cuba Libre",
        trigger_address: 101,
        recipe: &[134, 137, 136, 141, 142, 143],
        steps: &[
            StateKey::Ice,
            StateKey::Lime,
            StateKey::WhiteRum,
            StateKey::Coke,
            StateKey::DrinkReady,
        ],
    },
    Cocktail {
        id: "cognac",
        name: "Cognac",
        trigger_address: 102,
        recipe: &[138],
        steps: &[StateKey::Cognac, StateKey::DrinkReady],
    },
    Cocktail {
        id: "whiskey-rocks",
        name: "Whiskey on the Rocks",
        trigger_address: 103,
        recipe: &[134, 139],
        steps: &[StateKey::Ice, StateKey::Whiskey, StateKey::DrinkReady],
    },
    Cocktail {
        id: "neat-whiskey",
        name: "Neat Whiskey",
        trigger_address: 104,
        recipe: &[139],
        steps: &[StateKey::Whiskey, StateKey::DrinkReady],
    },
    Cocktail {
        id: "whiskey-highball",
        name: "Whiskey Highball",
        trigger_address: 105,
        recipe: &[134, 139, 140, 142, 143],
        steps: &[
            StateKey::Ice,
            StateKey::Whiskey,
            StateKey::Soda,
            StateKey::DrinkReady,
        ],
    },
    Cocktail {
        id: "whiskey-coke",
        name: "Whiskey and Coke",
        trigger_address: 106,
        recipe: &[134, 139, 141, 142, 143],
        steps: &[
            StateKey::Ice,
            StateKey::Whiskey,
            StateKey::Coke,
            StateKey::DrinkReady,
        ],
    },
];

/// Look up an ingredient by id.
pub fn ingredient(id: &str) -> Option<&'static Ingredient> {
    INGREDIENTS.iter().find(|i| i.id == id)
}

/// Look up a predefined cocktail by id. Custom drinks are synthesized with
/// [`custom_cocktail`] instead.
pub fn cocktail(id: &str) -> Option<&'static Cocktail> {
    COCKTAILS.iter().find(|c| c.id == id)
}

/// Resolve a trigger coil in the 100..=107 block back to a cocktail id.
pub fn cocktail_for_trigger(address: u16) -> Option<&'static str> {
    if address == CUSTOM_TRIGGER_ADDRESS {
        return Some(CUSTOM_COCKTAIL_ID);
    }
    COCKTAILS
        .iter()
        .find(|c| c.trigger_address == address)
        .map(|c| c.id)
}

/// Synthesize a custom drink from a caller supplied ingredient selection.
///
/// Unknown ingredient ids are silently dropped. Selected ingredients are
/// ordered by ascending address (the robot execution order), mint implies an
/// additional muddling write and a mixer (soda/coke) implies stirring and
/// straw writes. The step list always ends with the drink-ready pseudo step.
pub fn custom_cocktail(ingredient_ids: &[String]) -> CustomOrder {
    let mut selected: Vec<&'static Ingredient> = ingredient_ids
        .iter()
        .filter_map(|id| ingredient(id))
        .collect();
    selected.sort_by_key(|i| i.write_address);
    selected.dedup_by_key(|i| i.write_address);

    let mut recipe: Vec<u16> = selected.iter().map(|i| i.write_address).collect();
    if recipe.contains(&132) && !recipe.contains(&MUDDLING_WRITE_ADDRESS) {
        recipe.push(MUDDLING_WRITE_ADDRESS);
    }
    let has_mixer = recipe.contains(&140) || recipe.contains(&141);
    if has_mixer {
        if !recipe.contains(&STIRRING_WRITE_ADDRESS) {
            recipe.push(STIRRING_WRITE_ADDRESS);
        }
        if !recipe.contains(&STRAW_WRITE_ADDRESS) {
            recipe.push(STRAW_WRITE_ADDRESS);
        }
    }

    let mut steps: Vec<StateKey> = selected.iter().filter_map(|i| i.state_key).collect();
    steps.push(StateKey::DrinkReady);

    CustomOrder { recipe, steps }
}

/// Observable step list for a cocktail id, used for progress computation.
///
/// For custom drinks the caller must supply the ingredient selection; with
/// none available only the terminal drink-ready step can be tracked.
pub fn steps_for(cocktail_id: &str, custom_ingredients: Option<&[String]>) -> Vec<StateKey> {
    if cocktail_id == CUSTOM_COCKTAIL_ID {
        return match custom_ingredients {
            Some(ids) => custom_cocktail(ids).steps,
            None => vec![StateKey::DrinkReady],
        };
    }
    cocktail(cocktail_id)
        .map(|c| c.steps.to_vec())
        .unwrap_or_else(|| vec![StateKey::DrinkReady])
}
