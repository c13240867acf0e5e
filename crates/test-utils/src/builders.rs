use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tupledag::plan::ComputePlanRequest;
use tupledag::tuple::{
    CompositeTraintupleRequest, KeyChecksum, KeyChecksumAddress, TesttupleRequest,
    TraintupleRequest, TupleOutput,
};

/// Builder for `TraintupleRequest`; also used for aggregate tuples.
pub struct TraintupleBuilder {
    req: TraintupleRequest,
}

impl TraintupleBuilder {
    pub fn new(key: &str, algo_key: &str, worker: &str) -> Self {
        Self {
            req: TraintupleRequest {
                key: key.to_string(),
                algo_key: algo_key.to_string(),
                worker: worker.to_string(),
                ..TraintupleRequest::default()
            },
        }
    }

    pub fn parent(mut self, key: &str) -> Self {
        self.req.in_models.push(key.to_string());
        self
    }

    pub fn parents(mut self, keys: &[&str]) -> Self {
        self.req.in_models.extend(keys.iter().map(|k| k.to_string()));
        self
    }

    pub fn plan(self, compute_plan_key: &str, rank: u32) -> Self {
        self.raw_plan(compute_plan_key, &rank.to_string())
    }

    /// Plan fields exactly as a caller would send them, unparsed.
    pub fn raw_plan(mut self, compute_plan_key: &str, rank: &str) -> Self {
        self.req.compute_plan_key = compute_plan_key.to_string();
        self.req.rank = rank.to_string();
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.req.tag = tag.to_string();
        self
    }

    pub fn metadata(mut self, key: &str, value: &str) -> Self {
        self.req.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> TraintupleRequest {
        self.req
    }
}

/// Builder for `CompositeTraintupleRequest`.
pub struct CompositeBuilder {
    req: CompositeTraintupleRequest,
}

impl CompositeBuilder {
    pub fn new(key: &str, algo_key: &str, worker: &str) -> Self {
        Self {
            req: CompositeTraintupleRequest {
                key: key.to_string(),
                algo_key: algo_key.to_string(),
                worker: worker.to_string(),
                ..CompositeTraintupleRequest::default()
            },
        }
    }

    pub fn head(mut self, key: &str) -> Self {
        self.req.in_head_model_key = key.to_string();
        self
    }

    pub fn trunk(mut self, key: &str) -> Self {
        self.req.in_trunk_model_key = key.to_string();
        self
    }

    pub fn plan(mut self, compute_plan_key: &str, rank: u32) -> Self {
        self.req.compute_plan_key = compute_plan_key.to_string();
        self.req.rank = rank.to_string();
        self
    }

    pub fn build(self) -> CompositeTraintupleRequest {
        self.req
    }
}

/// Builder for `TesttupleRequest`.
pub struct TesttupleBuilder {
    req: TesttupleRequest,
}

impl TesttupleBuilder {
    pub fn new(key: &str, traintuple_key: &str, objective_key: &str) -> Self {
        Self {
            req: TesttupleRequest {
                key: key.to_string(),
                traintuple_key: traintuple_key.to_string(),
                objective_key: objective_key.to_string(),
                ..TesttupleRequest::default()
            },
        }
    }

    pub fn worker(mut self, worker: &str) -> Self {
        self.req.worker = worker.to_string();
        self
    }

    pub fn build(self) -> TesttupleRequest {
        self.req
    }
}

/// Builder for `ComputePlanRequest`.
pub struct ComputePlanBuilder {
    req: ComputePlanRequest,
}

impl ComputePlanBuilder {
    pub fn new(key: &str) -> Self {
        Self {
            req: ComputePlanRequest {
                key: key.to_string(),
                ..ComputePlanRequest::default()
            },
        }
    }

    pub fn traintuple(mut self, req: TraintupleRequest) -> Self {
        self.req.traintuples.push(req);
        self
    }

    pub fn aggregatetuple(mut self, req: TraintupleRequest) -> Self {
        self.req.aggregatetuples.push(req);
        self
    }

    pub fn composite(mut self, req: CompositeTraintupleRequest) -> Self {
        self.req.composite_traintuples.push(req);
        self
    }

    pub fn testtuple(mut self, req: TesttupleRequest) -> Self {
        self.req.testtuples.push(req);
        self
    }

    pub fn clean_models(mut self, val: bool) -> Self {
        self.req.clean_models = val;
        self
    }

    pub fn build(self) -> ComputePlanRequest {
        self.req
    }
}

/// A well-formed, seed-dependent 64-hex-digit checksum.
pub fn checksum(seed: &str) -> String {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    format!("{:064x}", hasher.finish())
}

/// Output of a train or aggregate tuple producing `model_key`.
pub fn model_output(model_key: &str) -> TupleOutput {
    TupleOutput::Model(KeyChecksumAddress {
        key: model_key.to_string(),
        checksum: checksum(model_key),
        storage_address: format!("https://storage.local/{model_key}"),
    })
}

/// Output of a composite tuple.
pub fn composite_output(head_key: &str, trunk_key: &str) -> TupleOutput {
    TupleOutput::Composite {
        head: KeyChecksum {
            key: head_key.to_string(),
            checksum: checksum(head_key),
        },
        trunk: KeyChecksumAddress {
            key: trunk_key.to_string(),
            checksum: checksum(trunk_key),
            storage_address: format!("https://storage.local/{trunk_key}"),
        },
    }
}
