//! Shop purchases

use anyhow::Result;
use dataprovider_common::{
    ledger::ActionEvaluation,
    records::{AgentRecord, ShopHistoryRecord, ShopItem},
    state::TradableItem,
    Address, ItemId, OrderId, Record,
};
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};
use tracing::warn;

use super::{agent_and_avatar, avatar_record, equipment_record, params};

#[serde_as]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseInfo {
    order_id: OrderId,
    tradable_id: ItemId,
    seller_agent_address: Address,
    seller_avatar_address: Address,
    /// NCG minor units
    #[serde_as(as = "DisplayFromStr")]
    price: i128,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuyParams {
    buyer_avatar_address: Address,
    purchase_infos: Vec<PurchaseInfo>,
}

pub fn buy(ev: &ActionEvaluation) -> Result<Vec<Record>> {
    let p: BuyParams = params(ev)?;
    let mut records = agent_and_avatar(ev, &p.buyer_avatar_address)?;

    for purchase in &p.purchase_infos {
        let Some(order) = ev
            .output_states
            .orders
            .get(&purchase.order_id)
            .or_else(|| ev.previous_states.orders.get(&purchase.order_id))
        else {
            warn!(
                order_id = %purchase.order_id,
                action_id = %ev.action_id(),
                "Order not found, skipping purchase"
            );
            continue;
        };

        let item = match &order.item {
            TradableItem::Equipment(e) => ShopItem::Equipment {
                item_id: e.item_id,
                equipment_id: e.equipment_id,
                item_sub_type: e.sub_type,
                grade: e.grade,
                level: e.level,
            },
            TradableItem::Costume(c) => ShopItem::Costume {
                item_id: c.item_id,
                costume_id: c.costume_id,
                item_sub_type: c.sub_type,
                grade: c.grade,
            },
            TradableItem::Material { id, grade } => ShopItem::Material {
                material_id: *id,
                grade: *grade,
            },
            TradableItem::Consumable {
                item_id,
                consumable_id,
                grade,
            } => ShopItem::Consumable {
                item_id: *item_id,
                consumable_id: *consumable_id,
                grade: *grade,
            },
        };

        records.push(Record::ShopHistory(ShopHistoryRecord {
            order_id: purchase.order_id,
            action_id: ev.action_id(),
            buyer_agent: ev.signer,
            buyer_avatar: p.buyer_avatar_address,
            seller_agent: purchase.seller_agent_address,
            seller_avatar: purchase.seller_avatar_address,
            item_count: order.item_count,
            price: purchase.price,
            item,
            block_index: ev.block_index,
        }));

        // The seller's avatar changed too
        if let Some(seller) = ev.output_states.avatar(&purchase.seller_avatar_address) {
            records.push(Record::Agent(AgentRecord {
                address: purchase.seller_agent_address,
                block_index: ev.block_index,
            }));
            records.push(avatar_record(
                &purchase.seller_avatar_address,
                seller,
                ev.block_index,
            ));
        }

        if let TradableItem::Equipment(sold) = &order.item {
            if !sold.sub_type.is_equipment() {
                continue;
            }
            let owned_by_buyer = ev
                .output_states
                .avatar(&p.buyer_avatar_address)
                .and_then(|a| a.inventory.equipment(&purchase.tradable_id));
            let owned_by_seller = ev
                .output_states
                .avatar(&purchase.seller_avatar_address)
                .and_then(|a| a.inventory.equipment(&purchase.tradable_id));

            let record = match (owned_by_buyer, owned_by_seller) {
                (Some(e), _) => {
                    equipment_record(&ev.signer, &p.buyer_avatar_address, e, ev.block_index)
                }
                (None, Some(e)) => equipment_record(
                    &purchase.seller_agent_address,
                    &purchase.seller_avatar_address,
                    e,
                    ev.block_index,
                ),
                (None, None) => {
                    equipment_record(&ev.signer, &p.buyer_avatar_address, sold, ev.block_index)
                }
            };
            records.push(record);
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::fixtures::*;
    use dataprovider_common::{
        state::{AvatarState, Equipment, ItemSubType, Order},
        RecordKind,
    };
    use serde_json::json;

    const SELLER_AGENT: Address = Address::new([0xc3; 20]);
    const SELLER_AVATAR: Address = Address::new([0xd4; 20]);
    const RING: ItemId = ItemId::new([0x33; 16]);

    fn ring() -> Equipment {
        Equipment {
            item_id: RING,
            equipment_id: 10540000,
            sub_type: ItemSubType::Ring,
            grade: 3,
            level: 5,
            combat_power: 900,
        }
    }

    fn seller() -> AvatarState {
        AvatarState {
            agent: SELLER_AGENT,
            name: "seller".into(),
            ..avatar()
        }
    }

    #[test]
    fn equipment_purchase_records_history_and_snapshot() {
        let order_id = OrderId::new([0x44; 16]);
        let mut previous = snapshot_with(avatar());
        previous.avatars.insert(SELLER_AVATAR, seller());
        previous.orders.insert(
            order_id,
            Order {
                item_count: 1,
                item: TradableItem::Equipment(ring()),
            },
        );
        let mut buyer = avatar();
        buyer.inventory.equipments.push(ring());
        let mut output = snapshot_with(buyer);
        output.avatars.insert(SELLER_AVATAR, seller());

        let ev = evaluation(
            "buy11",
            json!({
                "buyerAvatarAddress": AVATAR.to_string(),
                "purchaseInfos": [{
                    "orderId": order_id.to_string(),
                    "tradableId": RING.to_string(),
                    "sellerAgentAddress": SELLER_AGENT.to_string(),
                    "sellerAvatarAddress": SELLER_AVATAR.to_string(),
                    "itemSubType": "Ring",
                    "price": "1500"
                }]
            }),
            previous,
            output,
        );

        let records = buy(&ev).unwrap();
        let history = records
            .iter()
            .find_map(|r| match r {
                Record::ShopHistory(h) => Some(h),
                _ => None,
            })
            .unwrap();
        assert_eq!(history.price, 1500);
        assert_eq!(history.item_count, 1);
        assert!(matches!(history.item, ShopItem::Equipment { level: 5, .. }));

        match records.last() {
            Some(Record::Equipment(e)) => {
                assert_eq!(e.avatar, AVATAR);
                assert_eq!(e.item_id, RING);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            records.iter().filter(|r| r.kind() == RecordKind::Avatar).count(),
            2
        );
    }

    #[test]
    fn fungible_purchase_uses_order_count() {
        let order_id = OrderId::new([0x55; 16]);
        let mut output = snapshot_with(avatar());
        output.orders.insert(
            order_id,
            Order {
                item_count: 12,
                item: TradableItem::Material {
                    id: 303000,
                    grade: 1,
                },
            },
        );

        let ev = evaluation(
            "buy10",
            json!({
                "buyerAvatarAddress": AVATAR.to_string(),
                "purchaseInfos": [{
                    "orderId": order_id.to_string(),
                    "tradableId": ItemId::new([9; 16]).to_string(),
                    "sellerAgentAddress": SELLER_AGENT.to_string(),
                    "sellerAvatarAddress": SELLER_AVATAR.to_string(),
                    "price": "20"
                }]
            }),
            snapshot_with(avatar()),
            output,
        );

        let records = buy(&ev).unwrap();
        match records.last() {
            Some(Record::ShopHistory(h)) => {
                assert_eq!(h.item_count, 12);
                assert_eq!(
                    h.item,
                    ShopItem::Material {
                        material_id: 303000,
                        grade: 1
                    }
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
