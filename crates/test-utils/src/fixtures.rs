use tupledag::context::RequestContext;
use tupledag::engine::{Engine, EngineSettings};
use tupledag::errors::Result;
use tupledag::ledger::{LedgerDb, MemoryLedger};
use tupledag::permissions::InputPermissions;
use tupledag::plan::{ComputePlanRequest, ComputePlanView};
use tupledag::registry;
use tupledag::tuple::{
    CompositeTraintupleRequest, TesttupleRequest, TraintupleRequest, TupleOutput, TupleView,
};
use tupledag::types::{AssetType, Status};

pub const NODES: [&str; 3] = ["node-1", "node-2", "node-3"];
pub const ALGO: &str = "algo";
pub const COMPOSITE_ALGO: &str = "composite-algo";
pub const AGGREGATE_ALGO: &str = "aggregate-algo";
pub const OBJECTIVE: &str = "objective";
/// Objective only `node-1` may evaluate against.
pub const PRIVATE_OBJECTIVE: &str = "private-objective";

/// A ledger holding three nodes, one open algo of each kind and two
/// objectives.
pub fn seeded_ledger() -> MemoryLedger {
    let mut ledger = MemoryLedger::new();
    ledger
        .transact(|db| {
            for node in NODES {
                registry::register_node(db, node)?;
            }
            let open = InputPermissions::open();
            registry::register_algo(db, ALGO, AssetType::Algo, "sgd", NODES[0], &open)?;
            registry::register_algo(
                db,
                COMPOSITE_ALGO,
                AssetType::CompositeAlgo,
                "split",
                NODES[0],
                &open,
            )?;
            registry::register_algo(
                db,
                AGGREGATE_ALGO,
                AssetType::AggregateAlgo,
                "avg",
                NODES[0],
                &open,
            )?;
            registry::register_objective(db, OBJECTIVE, "auc", NODES[0], &open)?;
            let private = InputPermissions {
                public: false,
                authorized_ids: Vec::new(),
            };
            registry::register_objective(db, PRIVATE_OBJECTIVE, "f1", NODES[0], &private)?;
            Ok(())
        })
        .expect("seeding a fresh ledger");
    ledger
}

pub fn ctx(node: &str) -> RequestContext {
    RequestContext::new(node)
}

/// An engine over a seeded ledger; each call runs as its own transaction.
pub struct Harness {
    pub ledger: MemoryLedger,
    pub engine: Engine,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(EngineSettings::default())
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        Self {
            ledger: seeded_ledger(),
            engine: Engine::new(settings),
        }
    }

    /// Run `f` as one transaction.
    pub fn run<T>(
        &mut self,
        f: impl FnOnce(&Engine, &mut LedgerDb<'_>) -> Result<T>,
    ) -> Result<T> {
        let engine = &self.engine;
        self.ledger.transact(|db| f(engine, db))
    }

    pub fn traintuple(&mut self, caller: &str, req: TraintupleRequest) -> Result<String> {
        let ctx = ctx(caller);
        self.run(|e, db| e.create_traintuple(db, &ctx, &req))
    }

    pub fn aggregatetuple(&mut self, caller: &str, req: TraintupleRequest) -> Result<String> {
        let ctx = ctx(caller);
        self.run(|e, db| e.create_aggregatetuple(db, &ctx, &req))
    }

    pub fn composite(&mut self, caller: &str, req: CompositeTraintupleRequest) -> Result<String> {
        let ctx = ctx(caller);
        self.run(|e, db| e.create_composite_traintuple(db, &ctx, &req))
    }

    pub fn testtuple(&mut self, caller: &str, req: TesttupleRequest) -> Result<String> {
        let ctx = ctx(caller);
        self.run(|e, db| e.create_testtuple(db, &ctx, &req))
    }

    pub fn compute_plan(
        &mut self,
        caller: &str,
        req: ComputePlanRequest,
    ) -> Result<ComputePlanView> {
        let ctx = ctx(caller);
        self.run(|e, db| e.create_compute_plan(db, &ctx, &req))
    }

    pub fn cancel(&mut self, caller: &str, key: &str) -> Result<ComputePlanView> {
        let ctx = ctx(caller);
        self.run(|e, db| e.cancel_compute_plan(db, &ctx, key))
    }

    pub fn start(&mut self, caller: &str, key: &str) -> Result<TupleView> {
        let ctx = ctx(caller);
        self.run(|e, db| e.start(db, &ctx, key))
    }

    pub fn fail(&mut self, caller: &str, key: &str) -> Result<TupleView> {
        let ctx = ctx(caller);
        self.run(|e, db| e.fail(db, &ctx, key, "boom"))
    }

    pub fn succeed(&mut self, caller: &str, key: &str, output: TupleOutput) -> Result<TupleView> {
        let ctx = ctx(caller);
        self.run(|e, db| e.succeed(db, &ctx, key, output, "ok"))
    }

    /// `start` then `succeed`, both reported by the tuple's own worker.
    pub fn complete(&mut self, key: &str, output: TupleOutput) -> Result<TupleView> {
        let worker = self.get(key)?.base.worker;
        self.start(&worker, key)?;
        self.succeed(&worker, key, output)
    }

    pub fn get(&mut self, key: &str) -> Result<TupleView> {
        self.run(|e, db| e.get(db, key))
    }

    pub fn status(&mut self, key: &str) -> Status {
        self.get(key).expect("tuple exists").base.status
    }

    pub fn plan(&mut self, key: &str) -> Result<ComputePlanView> {
        self.run(|e, db| e.get_compute_plan(db, key))
    }
}
