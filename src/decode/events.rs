//! Built-in journal event payloads and their decode functions.

use serde::Deserialize;
use serde_json::Value;

use crate::{
    op::{ItemCount, MANUAL_CHANGE_EVENT, Operation, SnapshotSection},
    types::Subkind,
};

use super::{resolver::NameResolver, DecodeFn};

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NameCount {
    name: String,
    count: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TypeOnly {
    r#type: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TypeCount {
    r#type: String,
    count: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CraftPayload {
    ingredients: Vec<NameCount>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SynthesisPayload {
    materials: Vec<NameCount>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TradeSide {
    material: String,
    quantity: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TradePayload {
    paid: TradeSide,
    received: TradeSide,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContributionPayload {
    material: Option<String>,
    commodity: Option<String>,
    quantity: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MissionPayload {
    #[serde(default)]
    materials_reward: Vec<NameCount>,
    #[serde(default)]
    commodity_reward: Vec<NameCount>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MaterialsPayload {
    raw: Option<Vec<NameCount>>,
    manufactured: Option<Vec<NameCount>>,
    encoded: Option<Vec<NameCount>>,
}

type DecodeResult = Result<Option<Operation>, serde_json::Error>;

pub(super) fn builtin_handlers() -> [(&'static str, DecodeFn); 14] {
    let handlers: [(&'static str, DecodeFn); 14] = [
        (MANUAL_CHANGE_EVENT, manual_change),
        ("MaterialCollected", material_collected),
        ("MaterialDiscarded", material_discarded),
        ("MiningRefined", mining_refined),
        ("CollectCargo", collect_cargo),
        ("EjectCargo", eject_cargo),
        ("MarketBuy", market_buy),
        ("MarketSell", market_sell),
        ("EngineerCraft", engineer_craft),
        ("Synthesis", synthesis),
        ("MaterialTrade", material_trade),
        ("EngineerContribution", engineer_contribution),
        ("MissionCompleted", mission_completed),
        ("Materials", materials_snapshot),
    ];
    handlers
}

fn resolve_all(items: Vec<NameCount>, resolver: &dyn NameResolver) -> Vec<ItemCount> {
    items
        .into_iter()
        .map(|i| ItemCount::new(resolver.resolve_or_raw(&i.name), i.count))
        .collect()
}

fn manual_change(value: &Value, resolver: &dyn NameResolver) -> DecodeResult {
    let p = NameCount::deserialize(value)?;
    Ok(Some(Operation::ManualChange {
        name: resolver.resolve_or_raw(&p.name),
        count: p.count,
    }))
}

fn material_collected(value: &Value, resolver: &dyn NameResolver) -> DecodeResult {
    let p = NameCount::deserialize(value)?;
    Ok(Some(Operation::MaterialCollected {
        name: resolver.resolve_or_raw(&p.name),
        count: p.count,
    }))
}

fn material_discarded(value: &Value, resolver: &dyn NameResolver) -> DecodeResult {
    let p = NameCount::deserialize(value)?;
    Ok(Some(Operation::MaterialDiscarded {
        name: resolver.resolve_or_raw(&p.name),
        count: p.count,
    }))
}

fn mining_refined(value: &Value, resolver: &dyn NameResolver) -> DecodeResult {
    let p = TypeOnly::deserialize(value)?;
    Ok(Some(Operation::MiningRefined {
        name: resolver.resolve_or_raw(&p.r#type),
    }))
}

fn collect_cargo(value: &Value, resolver: &dyn NameResolver) -> DecodeResult {
    let p = TypeOnly::deserialize(value)?;
    Ok(Some(Operation::CargoCollected {
        name: resolver.resolve_or_raw(&p.r#type),
    }))
}

fn eject_cargo(value: &Value, resolver: &dyn NameResolver) -> DecodeResult {
    let p = TypeCount::deserialize(value)?;
    Ok(Some(Operation::CargoEjected {
        name: resolver.resolve_or_raw(&p.r#type),
        count: p.count,
    }))
}

fn market_buy(value: &Value, resolver: &dyn NameResolver) -> DecodeResult {
    let p = TypeCount::deserialize(value)?;
    Ok(Some(Operation::MarketBuy {
        name: resolver.resolve_or_raw(&p.r#type),
        count: p.count,
    }))
}

fn market_sell(value: &Value, resolver: &dyn NameResolver) -> DecodeResult {
    let p = TypeCount::deserialize(value)?;
    Ok(Some(Operation::MarketSell {
        name: resolver.resolve_or_raw(&p.r#type),
        count: p.count,
    }))
}

fn engineer_craft(value: &Value, resolver: &dyn NameResolver) -> DecodeResult {
    let p = CraftPayload::deserialize(value)?;
    Ok(Some(Operation::EngineerCraft {
        ingredients: resolve_all(p.ingredients, resolver),
    }))
}

fn synthesis(value: &Value, resolver: &dyn NameResolver) -> DecodeResult {
    let p = SynthesisPayload::deserialize(value)?;
    Ok(Some(Operation::Synthesis {
        materials: resolve_all(p.materials, resolver),
    }))
}

fn material_trade(value: &Value, resolver: &dyn NameResolver) -> DecodeResult {
    let p = TradePayload::deserialize(value)?;
    Ok(Some(Operation::MaterialTrade {
        paid: ItemCount::new(resolver.resolve_or_raw(&p.paid.material), p.paid.quantity),
        received: ItemCount::new(
            resolver.resolve_or_raw(&p.received.material),
            p.received.quantity,
        ),
    }))
}

// Credit and bounty contributions carry no item and have no inventory effect.
fn engineer_contribution(value: &Value, resolver: &dyn NameResolver) -> DecodeResult {
    let p = ContributionPayload::deserialize(value)?;
    let Some(raw) = p.material.or(p.commodity) else {
        return Ok(None);
    };
    Ok(Some(Operation::EngineerContribution {
        name: resolver.resolve_or_raw(&raw),
        count: p.quantity,
    }))
}

fn mission_completed(value: &Value, resolver: &dyn NameResolver) -> DecodeResult {
    let p = MissionPayload::deserialize(value)?;
    let mut rewards = resolve_all(p.materials_reward, resolver);
    rewards.extend(resolve_all(p.commodity_reward, resolver));
    if rewards.is_empty() {
        return Ok(None);
    }
    Ok(Some(Operation::MissionCompleted { rewards }))
}

fn materials_snapshot(value: &Value, resolver: &dyn NameResolver) -> DecodeResult {
    let p = MaterialsPayload::deserialize(value)?;
    let sections: Vec<SnapshotSection> = [
        (Subkind::Raw, p.raw),
        (Subkind::Manufactured, p.manufactured),
        (Subkind::Encoded, p.encoded),
    ]
    .into_iter()
    .filter_map(|(subkind, items)| {
        items.map(|items| SnapshotSection {
            subkind,
            items: resolve_all(items, resolver),
        })
    })
    .collect();

    if sections.is_empty() {
        return Ok(None);
    }
    Ok(Some(Operation::MaterialsSnapshot { sections }))
}
