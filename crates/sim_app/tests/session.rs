//! End-to-end session: raw wire messages routed onto the faction queues,
//! consumed by the dispatch loop on its own thread, replies read back.

use std::sync::Arc;
use std::thread;

use sim_app::components::Population;
use sim_app::phases::SECONDS_PER_YEAR;
use sim_app::{DispatchConfig, DispatchLoop, build_kernel};
use sim_kernel::KernelConfig;
use sim_net::subjects::faction_inbound;
use sim_net::{AdvanceReply, CommandQueues, InspectReply, Message, encode, kinds, route_inbound};

fn send(queues: &CommandQueues, faction: sim_component::Entity, message: &Message) {
    route_inbound(queues, &faction_inbound(faction), &encode(message).unwrap()).unwrap();
}

#[test]
fn test_session_advances_and_reports() {
    let (kernel, factions) = build_kernel(KernelConfig::new().with_timestep(3_600), 2, 1.0e6).unwrap();
    let (red, blue) = (factions[0], factions[1]);

    let colony = kernel
        .read(|store| {
            store
                .entities_with::<Population>()
                .into_iter()
                .next()
                .unwrap()
        })
        .unwrap();
    let before = kernel
        .read(|store| store.get_component::<Population>(colony).unwrap().count)
        .unwrap();

    let queues = Arc::new(CommandQueues::new());
    for &faction in &factions {
        queues.register_faction(faction);
    }

    let day = 86_400;
    send(&queues, red, &Message::echo(b"hello".to_vec()));
    send(&queues, blue, &Message::advance(day).unwrap());
    send(&queues, red, &Message::inspect(colony).unwrap());
    send(&queues, red, &Message::new("surrender", Vec::new()));
    send(&queues, blue, &Message::quit());

    let mut dispatch = DispatchLoop::new(kernel, Arc::clone(&queues), DispatchConfig::default());
    let summary = thread::spawn(move || {
        let summary = dispatch.run().unwrap();
        (summary, dispatch.into_kernel())
    })
    .join()
    .unwrap();
    let (summary, kernel) = summary;

    // Pass 1: red echo, blue advance. Pass 2: red inspect, blue quit.
    assert_eq!(summary.processed, 4);
    assert_eq!(queues.inbound_len(red), 1, "red's last message arrived after quit");
    assert_eq!(kernel.clock().now(), day as u64);

    let red_out = queues.drain_outbound(red);
    assert_eq!(red_out.len(), 2);
    assert_eq!(red_out[0].kind, kinds::ECHO);
    assert_eq!(red_out[0].payload, b"hello");
    assert_eq!(red_out[1].kind, kinds::COMPONENTS);
    let inspected: InspectReply = red_out[1].body().unwrap();
    let population = inspected
        .components
        .iter()
        .find_map(|record| record.decode::<Population>())
        .unwrap();
    let expected = before * (1.0 + population.annual_growth).powf(day as f64 / SECONDS_PER_YEAR);
    assert!((population.count - expected).abs() / expected < 1e-9);

    let blue_out = queues.drain_outbound(blue);
    assert_eq!(blue_out.len(), 1);
    let advanced: AdvanceReply = blue_out[0].body().unwrap();
    assert_eq!(advanced.advanced_secs, day as u64);
    assert_eq!(advanced.subpulses, 24);
    assert!(!advanced.interrupted);
}
