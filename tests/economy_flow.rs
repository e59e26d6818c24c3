use plaza::world::events::{ClientEvent, ServerEvent};
use plaza::world::types::FurniturePlacement;

mod common;
use common::TestClient;

fn buy_plot(client: &TestClient, server: &mut plaza::server::WorldServer, plot_id: &str) {
    client.send(
        server,
        ClientEvent::BuyHouse {
            plot_id: plot_id.into(),
        },
    );
}

#[tokio::test]
async fn plot_purchase_debits_once_and_broadcasts() {
    let (mut server, _tmp) = common::temp_server();
    let mut alice = TestClient::connect(&mut server);
    let mut bob = TestClient::connect(&mut server);
    common::register(&mut server, &mut alice, "alice");
    common::register(&mut server, &mut bob, "bob");
    alice.send(
        &mut server,
        ClientEvent::JoinDistrict {
            target: "housing".into(),
            spawn_pos: None,
        },
    );
    alice.drain();
    bob.drain();

    buy_plot(&alice, &mut server, "plot1");

    let events = alice.drain();
    assert_eq!(common::last_money(&events), Some(500));
    assert!(events.iter().any(|event| matches!(
        event,
        ServerEvent::HouseUpdate { plot }
            if plot.id == "plot1" && plot.owner.as_deref() == Some("alice")
    )));
    // The housing street hears about it too.
    assert!(common::chat_lines(&events)
        .iter()
        .any(|(_, text)| text.contains("alice bought plot1")));

    // Ownership changes reach every connection, not just the district.
    let events = bob.drain();
    assert!(events.iter().any(|event| matches!(
        event,
        ServerEvent::HouseUpdate { plot } if plot.owner.as_deref() == Some("alice")
    )));
    assert!(common::chat_lines(&events).is_empty());

    // Durable copy matches once the write-behind queue drains.
    server.flush_persistence().await;
    let store = server.store();
    assert_eq!(
        store.get_plot("plot1").expect("plot").owner.as_deref(),
        Some("alice")
    );
    assert_eq!(store.get_account("alice").expect("account").money, 500);
}

// Ownership is checked before funds: a sold-out plot reports "already
// owned" even to a buyer who could not afford it anyway, and nothing is
// debited.
#[tokio::test]
async fn sold_plots_report_owned_before_funds() {
    let (mut server, _tmp) = common::temp_server();
    let mut alice = TestClient::connect(&mut server);
    let mut bob = TestClient::connect(&mut server);
    common::register(&mut server, &mut alice, "alice");
    let b = common::register(&mut server, &mut bob, "bob");
    buy_plot(&alice, &mut server, "plot1");
    buy_plot(&bob, &mut server, "plot5");
    alice.drain();
    bob.drain();
    assert_eq!(server.session_snapshot(b).expect("bob").money, 100);

    buy_plot(&bob, &mut server, "plot1");

    let events = bob.drain();
    let lines = common::chat_lines(&events);
    assert!(lines.iter().any(|(_, text)| text.contains("already owned")));
    assert!(!lines.iter().any(|(_, text)| text.contains("insufficient")));
    assert_eq!(server.session_snapshot(b).expect("bob").money, 100);

    server.flush_persistence().await;
    let plot = server.store().get_plot("plot1").expect("plot");
    assert_eq!(plot.owner.as_deref(), Some("alice"));
}

#[tokio::test]
async fn unaffordable_plots_are_not_sold() {
    let (mut server, _tmp) = common::temp_server();
    let mut alice = TestClient::connect(&mut server);
    let a = common::register(&mut server, &mut alice, "alice");
    alice.drain();

    // plot6 costs 1200, the starting purse is 1000.
    buy_plot(&alice, &mut server, "plot6");

    let events = alice.drain();
    assert!(common::chat_lines(&events)
        .iter()
        .any(|(_, text)| text.contains("insufficient funds")));
    assert!(!events
        .iter()
        .any(|event| matches!(event, ServerEvent::HouseUpdate { .. })));
    assert_eq!(server.session_snapshot(a).expect("alice").money, 1000);

    // A plot id that does not exist fails the same way, with no debit.
    buy_plot(&alice, &mut server, "plot99");
    let events = alice.drain();
    assert!(common::chat_lines(&events)
        .iter()
        .any(|(_, text)| text.contains("unknown plot")));
    assert_eq!(server.session_snapshot(a).expect("alice").money, 1000);

    server.flush_persistence().await;
    assert!(server.store().get_plot("plot6").expect("plot").owner.is_none());
}

#[tokio::test]
async fn furniture_is_owner_only_and_append_only() {
    let (mut server, _tmp) = common::temp_server();
    let mut alice = TestClient::connect(&mut server);
    let mut bob = TestClient::connect(&mut server);
    common::register(&mut server, &mut alice, "alice");
    common::register(&mut server, &mut bob, "bob");
    buy_plot(&alice, &mut server, "plot2");
    alice.drain();
    bob.drain();

    let chair = FurniturePlacement {
        item: "chair".into(),
        color: "#aa3322".into(),
        x: 120.0,
        y: 80.0,
    };

    // A visitor cannot decorate someone else's plot.
    bob.send(
        &mut server,
        ClientEvent::PlaceFurniture {
            house_id: "plot2".into(),
            item: chair.clone(),
        },
    );
    let events = bob.drain();
    assert!(common::chat_lines(&events)
        .iter()
        .any(|(_, text)| text.contains("not the owner")));
    assert!(!events
        .iter()
        .any(|event| matches!(event, ServerEvent::HouseUpdate { .. })));

    // The owner can, and placements accumulate.
    alice.send(
        &mut server,
        ClientEvent::PlaceFurniture {
            house_id: "plot2".into(),
            item: chair.clone(),
        },
    );
    alice.send(
        &mut server,
        ClientEvent::PlaceFurniture {
            house_id: "plot2".into(),
            item: FurniturePlacement {
                item: "lamp".into(),
                color: "#ffd166".into(),
                x: 40.0,
                y: 30.0,
            },
        },
    );
    let events = alice.drain();
    let last_update = events
        .iter()
        .rev()
        .find_map(|event| match event {
            ServerEvent::HouseUpdate { plot } => Some(plot.clone()),
            _ => None,
        })
        .expect("houseUpdate");
    assert_eq!(last_update.furniture.len(), 2);
    assert_eq!(last_update.furniture[0], chair);

    server.flush_persistence().await;
    let plot = server.store().get_plot("plot2").expect("plot");
    assert_eq!(plot.furniture.len(), 2);
    assert_eq!(plot.furniture[1].item, "lamp");
}

// Buying a weapon equips it into the single slot, replacing whatever was
// there.
#[tokio::test]
async fn item_purchases_debit_and_replace_the_slot() {
    let (mut server, _tmp) = common::temp_server();
    let mut alice = TestClient::connect(&mut server);
    let mut bob = TestClient::connect(&mut server);
    let a = common::register(&mut server, &mut alice, "alice");
    common::register(&mut server, &mut bob, "bob");
    alice.drain();
    bob.drain();

    alice.send(
        &mut server,
        ClientEvent::BuyItem {
            item_id: "dagger".into(),
        },
    );
    let events = alice.drain();
    assert!(events.iter().any(|event| matches!(
        event,
        ServerEvent::ItemBought { item: Some(item), success: true } if item.id == "dagger"
    )));
    assert_eq!(common::last_money(&events), Some(900));
    assert!(common::chat_lines(&events)
        .iter()
        .any(|(_, text)| text.contains("alice bought a Dagger")));

    // Peers in the district see the equip change.
    let events = bob.drain();
    assert!(events.iter().any(|event| matches!(
        event,
        ServerEvent::PlayerUpdate { session }
            if session.id == a && session.item.as_deref() == Some("dagger")
    )));

    alice.send(
        &mut server,
        ClientEvent::BuyItem {
            item_id: "sword".into(),
        },
    );
    alice.drain();
    let snapshot = server.session_snapshot(a).expect("alice");
    assert_eq!(snapshot.item.as_deref(), Some("sword"));
    assert_eq!(snapshot.money, 650);
}

#[tokio::test]
async fn failed_item_purchases_change_nothing() {
    let (mut server, _tmp) = common::temp_server();
    let mut bob = TestClient::connect(&mut server);
    let b = common::register(&mut server, &mut bob, "bob");
    for item_id in ["bow", "axe"] {
        bob.send(
            &mut server,
            ClientEvent::BuyItem {
                item_id: item_id.into(),
            },
        );
    }
    bob.drain();
    assert_eq!(server.session_snapshot(b).expect("bob").money, 0);

    // Unknown id: a bare failure.
    bob.send(
        &mut server,
        ClientEvent::BuyItem {
            item_id: "spoon".into(),
        },
    );
    let events = bob.drain();
    assert!(events.iter().any(|event| matches!(
        event,
        ServerEvent::ItemBought {
            item: None,
            success: false
        }
    )));

    // Known but unaffordable: the item echoes back, nothing is equipped.
    bob.send(
        &mut server,
        ClientEvent::BuyItem {
            item_id: "dagger".into(),
        },
    );
    let events = bob.drain();
    assert!(events.iter().any(|event| matches!(
        event,
        ServerEvent::ItemBought { item: Some(item), success: false } if item.id == "dagger"
    )));
    let snapshot = server.session_snapshot(b).expect("bob");
    assert_eq!(snapshot.money, 0);
    assert_eq!(snapshot.item.as_deref(), Some("axe"));
}

// The quiz reward is granted on the server's own arithmetic, never the
// client's claim.
#[tokio::test]
async fn quiz_rewards_are_recomputed_server_side() {
    let (mut server, _tmp) = common::temp_server();
    let mut alice = TestClient::connect(&mut server);
    let a = common::register(&mut server, &mut alice, "alice");
    alice.drain();

    alice.send(
        &mut server,
        ClientEvent::SubmitQuizAnswer {
            num1: 17,
            num2: 25,
            answer: 42,
        },
    );
    let events = alice.drain();
    assert!(events.iter().any(|event| matches!(
        event,
        ServerEvent::QuizResult {
            success: true,
            reward: Some(150)
        }
    )));
    assert_eq!(common::last_money(&events), Some(1150));

    // A wrong sum earns nothing, even if the client insists.
    alice.send(
        &mut server,
        ClientEvent::SubmitQuizAnswer {
            num1: 17,
            num2: 25,
            answer: 43,
        },
    );
    let events = alice.drain();
    assert!(events.iter().any(|event| matches!(
        event,
        ServerEvent::QuizResult {
            success: false,
            reward: None
        }
    )));
    assert_eq!(common::last_money(&events), None);
    assert_eq!(server.session_snapshot(a).expect("alice").money, 1150);

    // Operands at the integer limit grade as wrong instead of wrapping.
    alice.send(
        &mut server,
        ClientEvent::SubmitQuizAnswer {
            num1: i64::MAX,
            num2: 1,
            answer: i64::MIN,
        },
    );
    let events = alice.drain();
    assert!(events.iter().any(|event| matches!(
        event,
        ServerEvent::QuizResult {
            success: false,
            reward: None
        }
    )));
    assert_eq!(server.session_snapshot(a).expect("alice").money, 1150);

    server.flush_persistence().await;
    assert_eq!(server.store().get_account("alice").expect("account").money, 1150);
}
