use plaza::config::Config;
use plaza::world::events::{ClientEvent, ServerEvent};

mod common;
use common::TestClient;

fn move_to(client: &TestClient, server: &mut plaza::server::WorldServer, x: f32, y: f32) {
    client.send(server, ClientEvent::Movement { x, y });
}

/// Config with the crossing cooldown disabled, so tests can cross an edge
/// immediately after logging in.
fn no_cooldown() -> Config {
    let mut cfg = Config::default();
    cfg.game.transfer_cooldown_ms = 0;
    cfg
}

// Applied positions go to district peers only; the mover already knows
// where it asked to be.
#[tokio::test]
async fn moves_broadcast_to_peers_not_the_mover() {
    let (mut server, _tmp) = common::temp_server();
    let mut alice = TestClient::connect(&mut server);
    let mut bob = TestClient::connect(&mut server);
    let a = common::register(&mut server, &mut alice, "alice");
    common::register(&mut server, &mut bob, "bob");
    alice.drain();
    bob.drain();

    move_to(&alice, &mut server, 410.0, 300.0);

    assert!(alice.drain().is_empty());
    let events = bob.drain();
    assert!(events.iter().any(|event| matches!(
        event,
        ServerEvent::PlayerMoved { session }
            if session.id == a && session.x == 410.0 && session.y == 300.0
    )));
}

// A diagonal request into an arena obstacle keeps the unobstructed axis.
#[tokio::test]
async fn obstructed_moves_slide_along_the_open_axis() {
    let (mut server, _tmp) = common::temp_server();
    let mut alice = TestClient::connect(&mut server);
    let mut bob = TestClient::connect(&mut server);
    let a = common::register(&mut server, &mut alice, "alice");
    common::register(&mut server, &mut bob, "bob");
    for client in [&alice, &bob] {
        client.send(
            &mut server,
            ClientEvent::JoinBattle {
                mode: "solo".into(),
                team: None,
            },
        );
    }
    alice.drain();
    bob.drain();

    // Walk to the left of the big central obstacle, then push into it
    // diagonally: the x axis is walled, the y axis stays free.
    move_to(&alice, &mut server, 280.0, 400.0);
    move_to(&alice, &mut server, 310.0, 405.0);

    let snapshot = server.session_snapshot(a).expect("session");
    assert_eq!((snapshot.x, snapshot.y), (280.0, 405.0));

    let applied: Vec<(f32, f32)> = bob
        .drain()
        .iter()
        .filter_map(|event| match event {
            ServerEvent::PlayerMoved { session } if session.id == a => {
                Some((session.x, session.y))
            }
            _ => None,
        })
        .collect();
    assert_eq!(applied, [(280.0, 400.0), (280.0, 405.0)]);
}

// Walking off a mapped edge lands the session just inside the neighbor,
// carrying the perpendicular coordinate over.
#[tokio::test]
async fn edge_crossing_teleports_to_the_neighbor() {
    let (mut server, _tmp) = common::temp_server_with(no_cooldown());
    let mut alice = TestClient::connect(&mut server);
    let a = common::register(&mut server, &mut alice, "alice");
    alice.drain();

    // Plaza's left edge leads to the beach.
    move_to(&alice, &mut server, -5.0, 250.0);
    assert_eq!(server.district_of(a), Some("beach"));
    let snapshot = server.session_snapshot(a).expect("session");
    assert_eq!((snapshot.x, snapshot.y), (760.0, 250.0));
    let events = alice.drain();
    assert!(events.iter().any(|event| matches!(
        event,
        ServerEvent::SetDistrict { name } if name == "beach"
    )));

    // And the beach's right edge leads straight back.
    move_to(&alice, &mut server, 805.0, 310.0);
    assert_eq!(server.district_of(a), Some("plaza"));
    let snapshot = server.session_snapshot(a).expect("session");
    assert_eq!((snapshot.x, snapshot.y), (40.0, 310.0));
}

// Edges without a neighbor are hard walls regardless of cooldown.
#[tokio::test]
async fn unmapped_edges_clamp_to_bounds() {
    let (mut server, _tmp) = common::temp_server_with(no_cooldown());
    let mut alice = TestClient::connect(&mut server);
    let a = common::register(&mut server, &mut alice, "alice");
    alice.drain();

    move_to(&alice, &mut server, 400.0, -25.0);
    assert_eq!(server.district_of(a), Some("plaza"));
    let snapshot = server.session_snapshot(a).expect("session");
    assert_eq!((snapshot.x, snapshot.y), (400.0, 0.0));
}

// Right after a transfer the crossing cooldown suppresses a bounce-back;
// the session clamps at the edge instead of crossing again.
#[tokio::test]
async fn crossing_cooldown_clamps_instead_of_bouncing() {
    let (mut server, _tmp) = common::temp_server();
    let mut alice = TestClient::connect(&mut server);
    let a = common::register(&mut server, &mut alice, "alice");
    alice.drain();

    // Login just transferred the session into the plaza, so the cooldown is
    // live and the left edge will not cross to the beach yet.
    move_to(&alice, &mut server, -5.0, 300.0);
    assert_eq!(server.district_of(a), Some("plaza"));
    let snapshot = server.session_snapshot(a).expect("session");
    assert_eq!((snapshot.x, snapshot.y), (0.0, 300.0));
    assert!(!alice
        .drain()
        .iter()
        .any(|event| matches!(event, ServerEvent::SetDistrict { .. })));
}

// Interiors carry no geometry: positions are applied as requested.
#[tokio::test]
async fn interiors_do_not_restrict_movement() {
    let (mut server, _tmp) = common::temp_server();
    let mut alice = TestClient::connect(&mut server);
    let a = common::register(&mut server, &mut alice, "alice");
    alice.send(
        &mut server,
        ClientEvent::EnterHouse {
            plot_id: "plot1".into(),
        },
    );
    alice.drain();

    move_to(&alice, &mut server, -50.0, 900.0);
    assert_eq!(server.district_of(a), Some("house_plot1"));
    let snapshot = server.session_snapshot(a).expect("session");
    assert_eq!((snapshot.x, snapshot.y), (-50.0, 900.0));
}
