use bandits_core::errors::FlowError;
use bandits_core::{Action, Actor, Line, Params, Scenario};
use bandits_flow::{ActorRegistry, ScenarioRegistry, Simulator};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

struct Ticks {
    remaining: usize,
}

impl Scenario for Ticks {
    fn scan(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }

    fn line(&self) -> Line {
        Line::from([("left".to_string(), json!(self.remaining))])
    }
}

struct Counter {
    total: f64,
}

impl Actor for Counter {
    fn act(&mut self, _line: &Line) -> Result<Action, FlowError> {
        self.total += 1.0;
        Ok(Action::new().with_metric("cum_reward", self.total))
    }
}

fn bench_simulate(c: &mut Criterion) {
    let mut scenarios = ScenarioRegistry::new();
    scenarios.register("ticks", |_| Ok(Box::new(Ticks { remaining: 1_000 }) as Box<dyn Scenario>));
    let mut actors = ActorRegistry::new();
    actors.register("counter", |_: &Params, _| {
        Ok(Box::new(Counter { total: 0.0 }) as Box<dyn Actor>)
    });
    let simulator = Simulator::new(&scenarios, &actors);
    let params = Params::new();

    c.bench_function("simulate_10x1000", |b| {
        b.iter(|| {
            let result = simulator
                .run(10, "ticks", "counter", &params, &mut [], black_box(7))
                .expect("simulate");
            black_box(result)
        })
    });
}

criterion_group!(benches, bench_simulate);
criterion_main!(benches);
