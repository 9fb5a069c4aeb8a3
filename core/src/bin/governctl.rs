/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * This file is part of the Ark Sovereign Compiler.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 *
 * 1. OPEN SOURCE: You may use this file under the terms of the GNU Affero
 * General Public License v3.0. If you link to this code, your ENTIRE
 * application must be open-sourced under AGPLv3.
 *
 * 2. COMMERCIAL: For proprietary use, you must obtain a Commercial License
 * from Sovereign Systems.
 *
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 * NO IMPLIED LICENSE to rights of Mohamad Al-Zawahreh or Sovereign Systems.
 */

use custodian_core::adapters::MockPlatformAdapter;
use custodian_core::clock::{Clock, SystemClock, OsRandom};
use custodian_core::config::GovernanceConfig;
use custodian_core::content::Content;
use custodian_core::coordinator::Coordinator;
use custodian_core::ledger::AuditLedger;
use custodian_core::tokens::TokenRegistry;
use custodian_core::workflow::SubmissionWorkflow;
use std::collections::BTreeMap;
use std::env;
use std::sync::Arc;

fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => match GovernanceConfig::load_from_path(std::path::Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("[governctl] failed to load config: {e}");
                std::process::exit(e.class().exit_code());
            }
        },
        None => GovernanceConfig::default(),
    };

    if let Err(e) = run(&config) {
        eprintln!("[governctl] {e}");
        std::process::exit(e.class().exit_code());
    }
    std::process::exit(0);
}

fn run(config: &GovernanceConfig) -> custodian_core::Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let ledger = Arc::new(AuditLedger::new_in_memory(clock.clone()));
    let tokens = Arc::new(TokenRegistry::new(clock.clone(), Arc::new(OsRandom)));
    let coordinator = Coordinator::new(ledger.clone(), tokens, clock, config);

    let draft = Content::DraftReport {
        title: "demo submission".into(),
        description: "produced by governctl's built-in demo run".into(),
        severity: "informational".into(),
        classification: "internal".into(),
        evidence_references: vec![],
        custom_fields: BTreeMap::new(),
    };

    let mut workflow = SubmissionWorkflow::new("governctl-demo".into());
    let mut friction = coordinator.begin_submission("governctl-demo".into(), &draft, "cli-demo")?;
    coordinator.friction.submit_edit(&mut friction, "a materially edited demo draft body")?;
    coordinator
        .friction
        .submit_challenge_answer(&mut friction, "confirmed via governctl demo")?;

    println!(
        "This is a demo run; in a real deployment the deliberation and cooldown \
         windows below must elapse with genuine human review in between."
    );
    std::thread::sleep(std::time::Duration::from_secs(config.min_deliberation_seconds));
    coordinator.friction.complete_deliberation(&mut friction)?;
    std::thread::sleep(std::time::Duration::from_secs(config.min_cooldown_seconds));

    let adapter = MockPlatformAdapter::new("demo-platform");
    let reference = coordinator.authorize_and_submit(
        &mut workflow,
        &mut friction,
        &draft,
        &adapter,
        "cli-operator",
        "cli-operator-confirmation",
    )?;

    println!("submission acknowledged: {reference}");
    println!("ledger head: {}", ledger.head());
    Ok(())
}
