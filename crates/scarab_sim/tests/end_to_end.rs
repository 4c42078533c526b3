//! End-to-end scenarios driving a real `Simulation` over a real WebSocket
//! connection (spec §8 "End-to-end scenarios").

use std::any::Any;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use scarab_core::Event;
use scarab_entity::{HandlerBinding, HandlerKind, ScarabEntity};
use scarab_sim::{Simulation, SimulationConfig};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;

struct Bee {
    temp: i64,
}

impl ScarabEntity for Bee {
    fn scarab_name(&self) -> &str {
        "bee"
    }

    fn view(&self) -> scarab_entity::EntityView {
        scarab_entity::EntityView::new("bee", scarab_core::EntityId::new()).with_property("temp", self.temp)
    }

    fn bindings(&self) -> Vec<HandlerBinding> {
        Vec::new()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct IncrementingBee {
    temp: i64,
}

impl ScarabEntity for IncrementingBee {
    fn scarab_name(&self) -> &str {
        "bee"
    }

    fn view(&self) -> scarab_entity::EntityView {
        scarab_entity::EntityView::new("bee", scarab_core::EntityId::new()).with_property("temp", self.temp)
    }

    fn bindings(&self) -> Vec<HandlerBinding> {
        vec![HandlerBinding::unconditional(HandlerKind::TimeUpdated, |entity, _event| {
            let bee = entity.as_any_mut().downcast_mut::<IncrementingBee>().unwrap();
            bee.temp += 1;
            Ok(())
        })]
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A `NamedEvent` subscriber that records every invocation and optionally
/// panics (simulated HandlerFault) when it fires.
struct PingSubscriber {
    label: &'static str,
    should_fail: bool,
    invocations: Arc<Mutex<Vec<&'static str>>>,
}

impl ScarabEntity for PingSubscriber {
    fn scarab_name(&self) -> &str {
        "ping_subscriber"
    }

    fn view(&self) -> scarab_entity::EntityView {
        scarab_entity::EntityView::new("ping_subscriber", scarab_core::EntityId::new())
    }

    fn bindings(&self) -> Vec<HandlerBinding> {
        let label = self.label;
        let should_fail = self.should_fail;
        let invocations = self.invocations.clone();
        vec![HandlerBinding::new(HandlerKind::NamedEvent, "ping", move |_entity, _event| {
            invocations.lock().unwrap().push(label);
            if should_fail {
                anyhow::bail!("{label} deliberately faults");
            }
            Ok(())
        })]
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Connects, sends `start` (the simulation sits in `ready` until an observer
/// does so — see spec §4.6), then collects every broadcast event up to and
/// including `until`.
async fn connect_and_collect(
    addr: std::net::SocketAddr,
    until: &str,
) -> Vec<Value> {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("client connects");
    let (mut write, mut read) = ws.split();
    write
        .send(Message::Text(json!({"action": "start"}).to_string()))
        .await
        .expect("start command sends");
    let mut events = Vec::new();
    while let Some(Ok(Message::Text(text))) = read.next().await {
        let value: Value = serde_json::from_str(&text).unwrap();
        let done = value["event_name"] == until;
        events.push(value);
        if done {
            break;
        }
    }
    events
}

#[tokio::test(flavor = "multi_thread")]
async fn single_bee_with_no_handlers_emits_created_then_two_ticks_then_shutdown() {
    let config = SimulationConfig::new("127.0.0.1", 19801, 2, Duration::ZERO, None).unwrap();
    let mut sim = Simulation::new(config);
    sim.register(Arc::new(Mutex::new(Bee { temp: 70 }))).unwrap();

    let handle = tokio::spawn(sim.run());
    tokio::time::sleep(Duration::from_millis(50)).await;
    let events = connect_and_collect("127.0.0.1:19801".parse().unwrap(), "scarab.simulation.shutdown").await;
    handle.await.unwrap().unwrap();

    let names: Vec<_> = events.iter().map(|e| e["event_name"].as_str().unwrap().to_string()).collect();
    assert_eq!(
        names,
        vec![
            "scarab.entity.created",
            "scarab.time.updated",
            "scarab.time.updated",
            "scarab.simulation.shutdown",
        ]
    );
    assert_eq!(events[0]["entity"]["temp"], 70);
}

#[tokio::test(flavor = "multi_thread")]
async fn handler_mutation_cascades_a_changed_event_every_tick() {
    let config = SimulationConfig::new("127.0.0.1", 19802, 3, Duration::ZERO, None).unwrap();
    let mut sim = Simulation::new(config);
    sim.register(Arc::new(Mutex::new(IncrementingBee { temp: 70 }))).unwrap();

    let handle = tokio::spawn(sim.run());
    tokio::time::sleep(Duration::from_millis(50)).await;
    let events = connect_and_collect("127.0.0.1:19802".parse().unwrap(), "scarab.simulation.shutdown").await;
    handle.await.unwrap().unwrap();

    let names: Vec<_> = events.iter().map(|e| e["event_name"].as_str().unwrap().to_string()).collect();
    assert_eq!(
        names,
        vec![
            "scarab.entity.created",
            "scarab.time.updated",
            "scarab.entity.changed",
            "scarab.time.updated",
            "scarab.entity.changed",
            "scarab.time.updated",
            "scarab.entity.changed",
            "scarab.simulation.shutdown",
        ]
    );
    let changed: Vec<_> = events
        .iter()
        .filter(|e| e["event_name"] == "scarab.entity.changed")
        .map(|e| e["entity"]["temp"].as_i64().unwrap())
        .collect();
    assert_eq!(changed, vec![71, 72, 73]);
}

#[tokio::test(flavor = "multi_thread")]
async fn a_failing_handler_does_not_stop_the_others() {
    let config = SimulationConfig::new("127.0.0.1", 19803, 1, Duration::ZERO, None).unwrap();
    let mut sim = Simulation::new(config);

    let invocations = Arc::new(Mutex::new(Vec::new()));
    sim.register(Arc::new(Mutex::new(PingSubscriber {
        label: "first",
        should_fail: false,
        invocations: invocations.clone(),
    })))
    .unwrap();
    sim.register(Arc::new(Mutex::new(PingSubscriber {
        label: "middle",
        should_fail: true,
        invocations: invocations.clone(),
    })))
    .unwrap();
    sim.register(Arc::new(Mutex::new(PingSubscriber {
        label: "last",
        should_fail: false,
        invocations: invocations.clone(),
    })))
    .unwrap();

    sim.send(Event::new("ping", sim.now() + 1)).unwrap();

    let handle = tokio::spawn(sim.run());
    tokio::time::sleep(Duration::from_millis(50)).await;
    let events = connect_and_collect("127.0.0.1:19803".parse().unwrap(), "scarab.simulation.shutdown").await;
    handle.await.unwrap().unwrap();

    assert!(events.iter().any(|e| e["event_name"] == "ping"));
    assert_eq!(*invocations.lock().unwrap(), vec!["first", "middle", "last"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn target_routing_invokes_only_the_targeted_entity() {
    let config = SimulationConfig::new("127.0.0.1", 19804, 1, Duration::ZERO, None).unwrap();
    let mut sim = Simulation::new(config);

    let invocations = Arc::new(Mutex::new(Vec::new()));
    let a = sim
        .register(Arc::new(Mutex::new(PingSubscriber {
            label: "a",
            should_fail: false,
            invocations: invocations.clone(),
        })))
        .unwrap();
    let b = sim
        .register(Arc::new(Mutex::new(PingSubscriber {
            label: "b",
            should_fail: false,
            invocations: invocations.clone(),
        })))
        .unwrap();
    let _ = a;

    sim.send(Event::new("ping", sim.now() + 1).with_target(b)).unwrap();

    let handle = tokio::spawn(sim.run());
    tokio::time::sleep(Duration::from_millis(50)).await;
    let events = connect_and_collect("127.0.0.1:19804".parse().unwrap(), "scarab.simulation.shutdown").await;
    handle.await.unwrap().unwrap();

    assert!(events.iter().any(|e| e["event_name"] == "ping"));
    assert_eq!(*invocations.lock().unwrap(), vec!["b"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn zero_steps_emits_only_shutdown() {
    let config = SimulationConfig::new("127.0.0.1", 19805, 0, Duration::ZERO, None).unwrap();
    let sim = Simulation::new(config);

    let handle = tokio::spawn(sim.run());
    tokio::time::sleep(Duration::from_millis(50)).await;
    let events = connect_and_collect("127.0.0.1:19805".parse().unwrap(), "scarab.simulation.shutdown").await;
    handle.await.unwrap().unwrap();

    let names: Vec<_> = events.iter().map(|e| e["event_name"].as_str().unwrap().to_string()).collect();
    assert_eq!(names, vec!["scarab.simulation.shutdown"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn pause_halts_ticks_until_resume_is_sent() {
    let config = SimulationConfig::new("127.0.0.1", 19806, 10, Duration::from_millis(20), None).unwrap();
    let sim = Simulation::new(config);

    let handle = tokio::spawn(sim.run());
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (ws, _) = tokio_tungstenite::connect_async("ws://127.0.0.1:19806")
        .await
        .expect("client connects");
    let (mut write, mut read) = ws.split();
    write.send(Message::Text(json!({"action": "start"}).to_string())).await.unwrap();

    // Wait for the second tick, then pause.
    loop {
        let Some(Ok(Message::Text(text))) = read.next().await else { break };
        let value: Value = serde_json::from_str(&text).unwrap();
        if value["event_name"] == "scarab.time.updated" && value["sim_time"] == 2 {
            write.send(Message::Text(json!({"action": "pause"}).to_string())).await.unwrap();
            break;
        }
    }

    // No further time.updated arrives while paused.
    let quiesced = tokio::time::timeout(Duration::from_millis(150), async {
        while let Some(Ok(Message::Text(text))) = read.next().await {
            let value: Value = serde_json::from_str(&text).unwrap();
            if value["event_name"] == "scarab.time.updated" {
                return Some(value);
            }
        }
        None
    })
    .await;
    assert!(quiesced.is_err() || quiesced.unwrap().is_none());

    write.send(Message::Text(json!({"action": "resume"}).to_string())).await.unwrap();

    let mut saw_shutdown = false;
    while let Some(Ok(Message::Text(text))) = read.next().await {
        let value: Value = serde_json::from_str(&text).unwrap();
        if value["event_name"] == "scarab.simulation.shutdown" {
            saw_shutdown = true;
            break;
        }
    }
    assert!(saw_shutdown);
    handle.await.unwrap().unwrap();
}
