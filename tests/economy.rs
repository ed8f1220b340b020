mod common;

use common::*;
use tycoon_tick::{
    rng::ScriptedRandom,
    store::InMemoryStore,
    world::{BuildingId, CompanyId, RegionId, SecuritySystem, Tier, TransactionKind},
};

fn town_with_depot(base_profit: i64) -> InMemoryStore {
    let store = InMemoryStore::new();
    region(&store, 1, Tier::Town, &["...."]);
    plain_type(&store, base_profit);
    company(&store, 1, 0, Some(1));
    place(&store, building(1, 1, 0, 0, 1));
    store
}

#[tokio::test]
async fn active_company_is_paid_net_of_tax() {
    let store = town_with_depot(1_000);

    let summary = scheduler(&store, ScriptedRandom::always(false))
        .run_tick()
        .await
        .unwrap();

    let company = store.company(CompanyId(1)).unwrap();
    assert_eq!(company.cash, 900);
    let transactions = store.transactions_for(CompanyId(1));
    assert_eq!(transactions.len(), 1);
    let income = &transactions[0];
    assert_eq!(income.kind, TransactionKind::TickIncome);
    assert_eq!(income.amount, 900);
    assert_eq!(income.tick_id, Some(summary.tick_id));
    let breakdown = income.breakdown.unwrap();
    assert_eq!((breakdown.gross, breakdown.tax, breakdown.net), (1_000, 100, 900));

    assert_eq!(summary.total_gross, 1_000);
    assert_eq!(summary.total_tax, 100);
    assert_eq!(summary.total_net, 900);
    assert_eq!(summary.buildings_recalculated, 1);
    assert!(!store.building(BuildingId(1)).unwrap().needs_recalculation);
}

#[tokio::test]
async fn inactive_company_gets_statistics_but_no_cash() {
    let store = town_with_depot(1_000);
    update_company(&store, 1, |c| {
        c.cash = 500;
        c.ticks_since_action = 6;
    });

    let summary = scheduler(&store, ScriptedRandom::always(false))
        .run_tick()
        .await
        .unwrap();

    let company = store.company(CompanyId(1)).unwrap();
    assert_eq!(company.cash, 500);
    assert_eq!(company.ticks_since_action, 7);
    assert!(store.transactions_for(CompanyId(1)).is_empty());
    let stats = store.statistics(CompanyId(1), RegionId(1)).unwrap();
    assert_eq!(stats.breakdown.net, 900);
    assert!(!stats.eligible);
    assert_eq!(stats.tick_id, summary.tick_id);
    assert_eq!(summary.total_net, 0);
}

#[tokio::test]
async fn damage_and_upkeep_come_out_of_gross() {
    let store = town_with_depot(1_000);
    let mut damaged = store.building(BuildingId(1)).unwrap();
    damaged.damage_percent = 50;
    damaged.security = Some(SecuritySystem {
        cameras: true,
        monthly_cost: 14_400,
        ..SecuritySystem::default()
    });
    store.insert_building(damaged);
    let mut ruin = building(2, 1, 2, 0, 1);
    ruin.damage_percent = 100;
    ruin.collapsed = true;
    place(&store, ruin);

    scheduler(&store, ScriptedRandom::always(false))
        .run_tick()
        .await
        .unwrap();

    // 1000 * (100 - 50 * 1.176) / 100 = 412, tax 41, upkeep 14400 / 144 = 100,
    // ruin maintenance 20000 * 0.05 = 1000.
    let stats = store.statistics(CompanyId(1), RegionId(1)).unwrap();
    assert_eq!(stats.breakdown.gross, 412);
    assert_eq!(stats.breakdown.tax, 41);
    assert_eq!(stats.breakdown.security_cost, 100);
    assert_eq!(stats.breakdown.collapsed_maintenance, 1_000);
    assert_eq!(stats.breakdown.net, 412 - 41 - 100 - 1_000);
    assert_eq!(stats.collapsed_count, 1);
    assert_eq!(store.company(CompanyId(1)).unwrap().cash, -729);
}

#[tokio::test]
async fn inactivity_counters_only_grow() {
    let store = town_with_depot(1_000);
    company(&store, 2, 0, None);
    region(&store, 2, Tier::City, &[".."]);
    store.set_region_active(RegionId(2), false);
    company(&store, 3, 0, Some(2));
    place(&store, building(3, 2, 0, 0, 3));

    let mut scheduler = scheduler(&store, ScriptedRandom::always(false));
    for expected in 1..=3 {
        scheduler.run_tick().await.unwrap();
        assert_eq!(store.company(CompanyId(1)).unwrap().ticks_since_action, expected);
        assert_eq!(store.company(CompanyId(2)).unwrap().ticks_since_action, expected);
    }
    // Holdings only in an inactive region are left alone.
    assert_eq!(store.company(CompanyId(3)).unwrap().ticks_since_action, 0);
    assert_eq!(store.history().len(), 3);
    assert_eq!(store.history()[2].idle_companies, 1);
}

#[tokio::test]
async fn holdings_in_two_regions_advance_the_counter_once() {
    let store = town_with_depot(1_000);
    region(&store, 2, Tier::Town, &[".."]);
    place(&store, building(2, 2, 0, 0, 1));
    update_company(&store, 1, |c| c.ticks_since_action = 5);

    let summary = scheduler(&store, ScriptedRandom::always(false))
        .run_tick()
        .await
        .unwrap();

    let company = store.company(CompanyId(1)).unwrap();
    assert_eq!(company.ticks_since_action, 6);
    // Both regions judge eligibility on the counter the tick started with.
    assert_eq!(company.cash, 1_800);
    assert_eq!(summary.total_net, 1_800);
    assert_eq!(store.transactions_for(CompanyId(1)).len(), 2);
    assert_eq!(summary.companies_updated, 1);
    assert_eq!(store.history()[0].companies_updated, 1);
}

#[tokio::test]
async fn collapsed_building_still_pays_for_its_security() {
    let store = town_with_depot(1_000);
    let mut ruin = building(2, 1, 2, 0, 1);
    ruin.damage_percent = 100;
    ruin.collapsed = true;
    ruin.security = Some(SecuritySystem {
        cameras: true,
        monthly_cost: 14_400,
        ..SecuritySystem::default()
    });
    place(&store, ruin);

    scheduler(&store, ScriptedRandom::always(false))
        .run_tick()
        .await
        .unwrap();

    let stats = store.statistics(CompanyId(1), RegionId(1)).unwrap();
    assert_eq!(stats.breakdown.gross, 1_000);
    assert_eq!(stats.breakdown.security_cost, 100);
    assert_eq!(stats.breakdown.collapsed_maintenance, 1_000);
    assert_eq!(stats.breakdown.net, 1_000 - 100 - 100 - 1_000);
    assert_eq!(store.company(CompanyId(1)).unwrap().cash, -200);
}
