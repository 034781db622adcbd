//! Integration tests for the tag coordinator
//!
//! These tests validate cross-component interactions and real network behavior.

use assert_approx_eq::assert_approx_eq;
use bincode::{deserialize, serialize};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use server::game::GameState;
use server::network::{Server, ServerSettings};
use server::router::{route, Outgoing, SessionEvent, Target};
use shared::geometry::Position;
use shared::{GameConfig, Packet, PlayerId, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// NETWORK PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// A join without a name survives the wire and gets the default name
    #[test]
    fn nameless_join_roundtrip() {
        let packet = Packet::SetName { name: None };
        let decoded: Packet = deserialize(&serialize(&packet).unwrap()).unwrap();
        assert_eq!(decoded, packet);

        let mut state = GameState::new(GameConfig::default());
        let mut rng = StdRng::seed_from_u64(1);
        let Packet::SetName { name } = decoded else {
            panic!("Wrong packet type after deserialization");
        };
        route(&mut state, SessionEvent::Join { id: 1, name }, &mut rng, 0);

        assert_eq!(state.player(1).unwrap().name, shared::DEFAULT_PLAYER_NAME);
    }

    /// A full server of players with oversized names still fits one datagram
    #[test]
    fn full_snapshot_fits_datagram() {
        let mut state = GameState::new(GameConfig::default());
        let mut rng = StdRng::seed_from_u64(5);
        let name = "\u{1F600}".repeat(500);
        for id in 1..=ServerSettings::default().max_clients as PlayerId {
            route(
                &mut state,
                SessionEvent::Join {
                    id,
                    name: Some(name.clone()),
                },
                &mut rng,
                0,
            );
        }

        let snapshot = Packet::CurrentPlayers {
            players: state.registry().snapshot(),
            tagger_id: state.tagger_id(),
        };
        assert!(serialize(&snapshot).unwrap().len() < 65_507);
    }

    /// Garbage datagrams do not decode into packets
    #[test]
    fn malformed_payload_rejected() {
        let garbage = [0xffu8, 0xff, 0xff, 0xff, 0x01];
        assert!(deserialize::<Packet>(&garbage).is_err());
    }
}

/// GAME SCENARIO TESTS
mod scenario_tests {
    use super::*;

    const NOW: u64 = 1_700_000_000_000;

    fn packets_for(outgoing: &[Outgoing], id: PlayerId) -> Vec<Packet> {
        outgoing
            .iter()
            .filter(|o| match o.target {
                Target::Only(target) => target == id,
                Target::All => true,
                Target::AllExcept(excluded) => excluded != id,
            })
            .map(|o| o.packet.clone())
            .collect()
    }

    /// Alice joins first and is it; Bob joins and sees both; Alice hears of Bob
    #[test]
    fn alice_and_bob_join() {
        let mut state = GameState::new(GameConfig::default());
        let mut rng = StdRng::seed_from_u64(42);
        let (alice, bob) = (1, 2);

        let out = route(
            &mut state,
            SessionEvent::Join {
                id: alice,
                name: Some("Alice".to_string()),
            },
            &mut rng,
            NOW,
        );
        match &packets_for(&out, alice)[0] {
            Packet::CurrentPlayers { players, tagger_id } => {
                assert_eq!(*tagger_id, Some(alice));
                assert!(players[&alice].frozen_until < NOW);
            }
            other => panic!("Unexpected packet {:?}", other),
        }

        let out = route(
            &mut state,
            SessionEvent::Join {
                id: bob,
                name: Some("Bob".to_string()),
            },
            &mut rng,
            NOW,
        );
        match &packets_for(&out, bob)[..] {
            [Packet::CurrentPlayers { players, tagger_id }] => {
                assert_eq!(players.len(), 2);
                assert_eq!(*tagger_id, Some(alice));
            }
            other => panic!("Unexpected packets {:?}", other),
        }
        match &packets_for(&out, alice)[..] {
            [Packet::NewPlayer { player }] => assert_eq!(player.name, "Bob"),
            other => panic!("Unexpected packets {:?}", other),
        }
    }

    /// Tagger at (100,100) next to a player at (110,100) tags on its next move
    #[test]
    fn tag_transfer_within_one_event() {
        let mut state = GameState::new(GameConfig::default());
        let mut rng = StdRng::seed_from_u64(42);
        state.join(1, Some("T"), &mut rng);
        state.join(2, Some("P"), &mut rng);
        state.place_player(1, Position::new(100.0, 100.0));
        state.place_player(2, Position::new(110.0, 100.0));

        let out = route(
            &mut state,
            SessionEvent::Move { id: 1, dx: 2.0, dy: 0.0 },
            &mut rng,
            NOW,
        );

        for viewer in [1, 2] {
            assert_eq!(
                packets_for(&out, viewer),
                vec![
                    Packet::PlayerMoved {
                        id: 1,
                        x: 102.0,
                        y: 100.0
                    },
                    Packet::TaggerChanged { tagger_id: Some(2) },
                ]
            );
        }
        assert_eq!(state.tagger_id(), Some(2));
        assert_eq!(state.player(2).unwrap().frozen_until, NOW + 3000);
    }

    /// The newly tagged player cannot move, and therefore cannot tag back, until the freeze ends
    #[test]
    fn frozen_tagger_cannot_tag_back() {
        let mut state = GameState::new(GameConfig::default());
        let mut rng = StdRng::seed_from_u64(42);
        state.join(1, Some("T"), &mut rng);
        state.join(2, Some("P"), &mut rng);
        state.place_player(1, Position::new(100.0, 100.0));
        state.place_player(2, Position::new(110.0, 100.0));
        route(&mut state, SessionEvent::Move { id: 1, dx: 1.0, dy: 0.0 }, &mut rng, NOW);

        let blocked = route(
            &mut state,
            SessionEvent::Move { id: 2, dx: -1.0, dy: 0.0 },
            &mut rng,
            NOW + 2_999,
        );
        assert!(blocked.is_empty());
        assert_eq!(state.tagger_id(), Some(2));

        let out = route(
            &mut state,
            SessionEvent::Move { id: 2, dx: -1.0, dy: 0.0 },
            &mut rng,
            NOW + 3_000,
        );
        assert_eq!(
            out.last().map(|o| &o.packet),
            Some(&Packet::TaggerChanged { tagger_id: Some(1) })
        );
    }

    /// Disconnecting twice has the same effect as disconnecting once
    #[test]
    fn disconnect_is_idempotent() {
        let mut state = GameState::new(GameConfig::default());
        let mut rng = StdRng::seed_from_u64(42);
        state.join(1, None, &mut rng);
        state.join(2, None, &mut rng);

        let first = route(&mut state, SessionEvent::Disconnect { id: 1 }, &mut rng, NOW);
        let tagger_after_first = state.tagger_id();
        let frozen_after_first = state.player(2).unwrap().frozen_until;
        let second = route(&mut state, SessionEvent::Disconnect { id: 1 }, &mut rng, NOW + 500);

        assert_eq!(first.len(), 2);
        assert!(second.is_empty());
        assert_eq!(state.tagger_id(), tagger_after_first);
        assert_eq!(state.player(2).unwrap().frozen_until, frozen_after_first);
    }

    /// Random event storms keep the tagger and bounds invariants
    #[test]
    fn invariants_hold_under_random_events() {
        let config = GameConfig::default();
        let bounds = config.bounds();
        let mut state = GameState::new(config);
        let mut rng = StdRng::seed_from_u64(2024);

        for step in 0..5_000u64 {
            let id: PlayerId = rng.gen_range(1..=8);
            let event = match rng.gen_range(0..12) {
                0 | 1 => SessionEvent::Join { id, name: None },
                2 => SessionEvent::Disconnect { id },
                _ => SessionEvent::Move {
                    id,
                    dx: rng.gen_range(-600.0..600.0),
                    dy: rng.gen_range(-600.0..600.0),
                },
            };
            route(&mut state, event, &mut rng, NOW + step * 250);

            assert_eq!(state.tagger_id().is_none(), state.registry().is_empty());
            if let Some(tagger) = state.tagger_id() {
                assert!(state.player(tagger).is_some());
            }
            for player in state.registry().iter() {
                assert!(bounds.contains(&player.position()), "{:?} out of bounds", player);
            }
        }
    }
}

/// CLIENT-SERVER INTEGRATION TESTS
mod client_server_tests {
    use super::*;

    async fn start_server() -> SocketAddr {
        let mut server = Server::new("127.0.0.1:0", GameConfig::default(), ServerSettings::default())
            .await
            .unwrap()
            .with_seed(7);
        let addr = server.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = server.run().await;
        });
        addr
    }

    struct TestClient {
        socket: UdpSocket,
        server: SocketAddr,
    }

    impl TestClient {
        async fn connect(server: SocketAddr) -> (Self, PlayerId) {
            let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            let client = TestClient { socket, server };
            client
                .send(&Packet::Connect {
                    client_version: PROTOCOL_VERSION,
                })
                .await;
            match client.recv().await {
                Packet::Connected { client_id } => (client, client_id),
                other => panic!("Expected Connected, got {:?}", other),
            }
        }

        async fn send(&self, packet: &Packet) {
            let data = serialize(packet).unwrap();
            self.socket.send_to(&data, self.server).await.unwrap();
        }

        async fn recv(&self) -> Packet {
            let mut buf = vec![0u8; 65536];
            let (len, _) = timeout(Duration::from_secs(2), self.socket.recv_from(&mut buf))
                .await
                .expect("timed out waiting for packet")
                .unwrap();
            deserialize(&buf[..len]).unwrap()
        }
    }

    /// Full game over real UDP: join, tag, frozen move, tagger leaves
    #[tokio::test]
    async fn tag_game_over_udp() {
        let server = start_server().await;

        let (alice, alice_id) = TestClient::connect(server).await;
        alice
            .send(&Packet::SetName {
                name: Some("Alice".to_string()),
            })
            .await;
        match alice.recv().await {
            Packet::CurrentPlayers { players, tagger_id } => {
                assert_eq!(players.len(), 1);
                assert_eq!(tagger_id, Some(alice_id));
            }
            other => panic!("Unexpected packet {:?}", other),
        }

        let (bob, bob_id) = TestClient::connect(server).await;
        assert_ne!(alice_id, bob_id);
        bob.send(&Packet::SetName {
            name: Some("Bob".to_string()),
        })
        .await;
        let (alice_start, bob_start) = match bob.recv().await {
            Packet::CurrentPlayers { players, tagger_id } => {
                assert_eq!(players.len(), 2);
                assert_eq!(tagger_id, Some(alice_id));
                (players[&alice_id].position(), players[&bob_id].position())
            }
            other => panic!("Unexpected packet {:?}", other),
        };
        match alice.recv().await {
            Packet::NewPlayer { player } => assert_eq!(player.id, bob_id),
            other => panic!("Unexpected packet {:?}", other),
        }

        // Alice runs straight onto Bob
        alice
            .send(&Packet::Move {
                x: bob_start.x - alice_start.x,
                y: bob_start.y - alice_start.y,
            })
            .await;
        for client in [&alice, &bob] {
            match client.recv().await {
                Packet::PlayerMoved { id, x, y } => {
                    assert_eq!(id, alice_id);
                    assert_approx_eq!(x, bob_start.x, 0.01);
                    assert_approx_eq!(y, bob_start.y, 0.01);
                }
                other => panic!("Unexpected packet {:?}", other),
            }
            assert_eq!(
                client.recv().await,
                Packet::TaggerChanged {
                    tagger_id: Some(bob_id)
                }
            );
        }

        // Bob is frozen, so only Alice's step towards the centre is broadcast
        bob.send(&Packet::Move { x: 5.0, y: 5.0 }).await;
        let step = if bob_start.x < 960.0 { 1.0 } else { -1.0 };
        alice.send(&Packet::Move { x: step, y: 0.0 }).await;
        match bob.recv().await {
            Packet::PlayerMoved { id, .. } => assert_eq!(id, alice_id),
            other => panic!("Unexpected packet {:?}", other),
        }

        // The tagger leaves and Alice takes over
        bob.send(&Packet::Disconnect).await;
        let _alice_step = alice.recv().await;
        assert_eq!(alice.recv().await, Packet::PlayerDisconnected { id: bob_id });
        assert_eq!(
            alice.recv().await,
            Packet::TaggerChanged {
                tagger_id: Some(alice_id)
            }
        );
    }

    /// Packets from addresses that never connected are ignored
    #[tokio::test]
    async fn unconnected_moves_are_ignored() {
        let server = start_server().await;

        let stranger = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let data = serialize(&Packet::Move { x: 10.0, y: 10.0 }).unwrap();
        stranger.send_to(&data, server).await.unwrap();

        let (alice, alice_id) = TestClient::connect(server).await;
        assert_eq!(alice_id, 1);
        alice.send(&Packet::SetName { name: None }).await;
        match alice.recv().await {
            Packet::CurrentPlayers { players, tagger_id } => {
                assert_eq!(players.len(), 1);
                assert_eq!(players[&alice_id].name, shared::DEFAULT_PLAYER_NAME);
                assert_eq!(tagger_id, Some(alice_id));
            }
            other => panic!("Unexpected packet {:?}", other),
        }
    }
}
