use clients::{
    InMemoryIdentityClient, InMemoryLegacyChatClient, InMemoryMessagingClient,
    InMemorySchedulingClient, InMemoryStore,
};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{NewConsultant, Role};
use provisioning::{ProvisioningSaga, StepLedger, steps};

fn input(n: u32) -> NewConsultant {
    NewConsultant {
        username: format!("bench-user-{n}"),
        password: "s3cret!".to_string(),
        first_name: "Bench".to_string(),
        last_name: "User".to_string(),
        email: format!("bench-{n}@example.org"),
        roles: vec![Role::Consultant],
    }
}

fn bench_full_provisioning(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("provisioning/full_saga", |b| {
        let mut n = 0u32;
        b.iter(|| {
            n += 1;
            rt.block_on(async {
                let saga = ProvisioningSaga::new(
                    InMemoryIdentityClient::new(),
                    InMemoryLegacyChatClient::new(),
                    InMemoryMessagingClient::new(),
                    InMemoryStore::new(),
                    InMemorySchedulingClient::new(),
                );
                saga.provision(input(n)).await.unwrap();
            });
        });
    });
}

fn bench_ledger_recording(c: &mut Criterion) {
    c.bench_function("provisioning/ledger_record", |b| {
        b.iter(|| {
            let mut ledger = StepLedger::new(steps::OPERATION_CREATE_CONSULTANT);
            for step in steps::ORDERED {
                ledger.record_completed(step);
            }
            ledger.completed_steps().len()
        });
    });
}

criterion_group!(benches, bench_full_provisioning, bench_ledger_recording);
criterion_main!(benches);
