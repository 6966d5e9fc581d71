use std::{
    collections::HashMap,
    str::FromStr,
    time::{Duration, Instant},
};

use easy_parallel::Parallel;
use haisou_chan::{channel, Bandwidth};
use k256::Secp256k1;
use p256::NistP256;
use rand_core::{OsRng, RngCore};
use ring_ecdh::{
    protocol::{Action, MessageData, Participant, Protocol},
    ring_agreement, run_ring_agreement_with, CSCurve, Domain, Party,
};
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy)]
enum BuiltinCurve {
    Secp256k1,
    P256,
}

impl FromStr for BuiltinCurve {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "secp256k1" | "k256" => Ok(Self::Secp256k1),
            "p256" | "p-256" | "secp256r1" => Ok(Self::P256),
            _ => Err(format!("unknown curve: {s}")),
        }
    }
}

#[derive(Debug, StructOpt)]
struct Args {
    /// The number of parties in the ring.
    parties: u32,
    /// The latency, in milliseconds.
    latency_ms: u32,
    /// The bandwidth, in bytes per second.
    bandwidth: u32,
    /// The curve to use, either secp256k1 or p256. Picked at random if absent.
    #[structopt(long)]
    curve: Option<BuiltinCurve>,
}

#[derive(Debug, Clone, Copy)]
struct Stats {
    sent: usize,
    received: usize,
}

fn run_ring<T, F, P>(
    latency: Duration,
    bandwidth: Bandwidth,
    participants: &[Participant],
    f: F,
) -> Vec<(Participant, Stats, T)>
where
    F: Fn(Participant) -> P + Send + Sync,
    P: Protocol<Output = T>,
    T: Send + std::fmt::Debug,
{
    // Parties only ever talk to the next party in the ring, so that's the only
    // link we need for each of them.
    let mut sorted = participants.to_vec();
    sorted.sort();
    let n = sorted.len();

    let executor = smol::Executor::new();

    let mut outgoing = HashMap::new();
    let mut incoming = HashMap::new();
    for (i, &p) in sorted.iter().enumerate() {
        let next = sorted[(i + 1) % n];
        let (mut sender, mut receiver) = channel();
        sender.set_bandwidth(bandwidth);
        receiver.set_latency(latency);
        outgoing.insert(p, (next, sender));
        incoming.insert(next, (p, receiver));
    }

    let setup = sorted.iter().map(|p| {
        let outgoing = outgoing.remove(p).unwrap();
        let incoming = incoming.remove(p).unwrap();
        (*p, outgoing, incoming)
    });

    let mut out = Parallel::new()
        .each(setup, |(p, (next, mut sender), (prev, receiver))| {
            smol::block_on(executor.run(async {
                let mut prot = f(p);
                let mut stats = Stats {
                    sent: 0,
                    received: 0,
                };
                loop {
                    loop {
                        match prot.poke().unwrap() {
                            Action::Wait => break,
                            Action::SendPrivate(q, m) => {
                                assert_eq!(q, next, "{p} tried to skip ahead in the ring");
                                stats.sent += m.len();
                                sender.send(m.len(), m).await.unwrap();
                            }
                            Action::Return(r) => return (p, stats, r),
                        }
                    }
                    let m: MessageData = receiver.recv().await.unwrap();
                    stats.received += m.len();
                    prot.message(prev, m);
                }
            }))
        })
        .run();

    out.sort_by_key(|(p, _, _)| *p);

    out
}

fn report_stats<I>(iter: I)
where
    I: Iterator<Item = Stats>,
{
    let mut count = 0;
    let mut avg_up = 0;
    let mut avg_down = 0;
    iter.for_each(|stats| {
        count += 1;
        avg_up += stats.sent;
        avg_down += stats.received;
    });
    avg_up /= count;
    avg_down /= count;
    println!("up:\t {} B", avg_up);
    println!("down:\t {} B", avg_down);
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn run_demo<C: CSCurve>(args: &Args) {
    let domain = Domain::<C>::builtin();
    if let Some(metadata) = domain.metadata() {
        println!("Curve: {metadata}");
    }

    let latency = Duration::from_millis(args.latency_ms as u64);
    let mut parties: Vec<Party<C>> = (0..args.parties)
        .map(|i| Party::new(&domain, Participant::from(i), &mut OsRng))
        .collect();
    let participants: Vec<_> = parties.iter().map(|p| p.id()).collect();
    let keys: HashMap<_, _> = parties.iter().map(|p| (p.id(), p.keys().clone())).collect();

    println!(
        "\nRing ECDH {} [{} ms, {} B/S]",
        args.parties, args.latency_ms, args.bandwidth
    );
    let start = Instant::now();
    let results = run_ring(latency, args.bandwidth, &participants, |p| {
        ring_agreement(&domain, &participants, p, keys[&p].clone()).unwrap()
    });
    let stop = Instant::now();
    println!("time:\t{:#?}", stop.duration_since(start));
    report_stats(results.iter().map(|(_, stats, _)| *stats));

    let secret = &results[0].2;
    assert!(results.iter().all(|(_, _, s)| s == secret));
    println!("key:\t{}", hex(&secret.derive_key(b"network-ring demo")));

    println!("\nSimulated ring {}", args.parties);
    let start = Instant::now();
    run_ring_agreement_with(&domain, &mut parties, |trace| {
        let harvested = if trace.harvested { " (harvested)" } else { "" };
        println!("round {}: {}{harvested}", trace.round, trace.holder.id());
        for acc in trace.forwarded {
            println!("\t{acc}");
        }
    })
    .unwrap();
    let stop = Instant::now();
    println!("time:\t{:#?}", stop.duration_since(start));
    assert!(parties.iter().all(|p| p.shared_secret() == Some(secret)));
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::from_args();
    let curve = args.curve.unwrap_or_else(|| {
        if OsRng.next_u32() % 2 == 0 {
            BuiltinCurve::Secp256k1
        } else {
            BuiltinCurve::P256
        }
    });
    match curve {
        BuiltinCurve::Secp256k1 => run_demo::<Secp256k1>(&args),
        BuiltinCurve::P256 => run_demo::<NistP256>(&args),
    }
}
