use std::sync::Arc;

use anyhow::Result;

use crate::account::{create_account, Account};
use crate::cli::{Cli, WorkflowCommand};
use crate::commands::{resolve_config, resolve_signer, Services};
use crate::crypto::AccountAddress;
use crate::operation::Package;
use crate::workflow::{IndexerVerdict, StepOutcome, Workflow, WorkflowReport};
use crate::workflows::{self, FAUCET_AMOUNT};

pub async fn run(cli: &Cli, cmd: &WorkflowCommand) -> Result<()> {
	let config = resolve_config(cli)?;
	let services = Services::connect(&config)?;
	let workflow = build(cmd, || resolve_signer(&config))?;

	let report = services.orchestrator().run(&workflow).await;
	print_report(&report);
	report.into_result()?;
	Ok(())
}

fn build(cmd: &WorkflowCommand, signer: impl FnOnce() -> Result<Account>) -> Result<Workflow> {
	let workflow = match cmd {
		WorkflowCommand::Transfer { amount } => {
			let alice = Arc::new(create_account()?);
			let bob = Arc::new(create_account()?);
			println!("Alice: {}", alice.address());
			println!("Bob:   {}", bob.address());
			workflows::transfer::coin_transfer(alice, bob, FAUCET_AMOUNT, *amount)
		}
		WorkflowCommand::MoonCoin {
			package_dir,
			package,
			module,
		} => {
			let publisher = Arc::new(signer()?);
			let receiver = Arc::new(create_account()?);
			let package = Package::load(package_dir, package, &[module.as_str()])?;
			println!("Publisher: {}", publisher.address());
			println!("Receiver:  {}", receiver.address());
			workflows::moon_coin::moon_coin(publisher, receiver, package, FAUCET_AMOUNT)
		}
		WorkflowCommand::Nft => {
			let alice = Arc::new(create_account()?);
			let bob = Arc::new(create_account()?);
			println!("Alice: {}", alice.address());
			println!("Bob:   {}", bob.address());
			workflows::nft::simple_nft(alice, bob, FAUCET_AMOUNT)
		}
		WorkflowCommand::FaCoin { holder } => {
			let creator = Arc::new(signer()?);
			let holder: AccountAddress = match holder {
				Some(h) => h.parse()?,
				None => create_account()?.address(),
			};
			println!("Creator: {}", creator.address());
			println!("Holder:  {holder}");
			workflows::fa_coin::fa_coin(creator, holder)
		}
	};
	Ok(workflow)
}

fn print_report(report: &WorkflowReport) {
	println!();
	println!("Workflow: {}", report.workflow);
	for record in &report.records {
		let detail = match &record.outcome {
			StepOutcome::Submitted(r) | StepOutcome::Funded(r) => {
				format!("{} (fee {})", r.hash, r.fee)
			}
			StepOutcome::Viewed(values) => format!("{} value(s)", values.len()),
			StepOutcome::Verified => "verified".to_owned(),
			StepOutcome::Skipped(reason) => format!("skipped: {reason}"),
		};
		println!(
			"  [{}] {:<22} {} ({} check(s))",
			record.index, record.name, detail, record.checks_passed
		);
	}
	match &report.indexer {
		IndexerVerdict::NotConsulted => {}
		IndexerVerdict::Trusted => println!("Indexer: in sync"),
		IndexerVerdict::Desync { node, indexer } => {
			println!("Indexer: out of sync (node {node}, indexer {indexer})")
		}
		IndexerVerdict::Unavailable(why) => println!("Indexer: unavailable ({why})"),
	}
	match report.failure() {
		None => println!("Status: completed"),
		Some(f) => println!("Status: aborted at step {} ({})", f.index, f.name),
	}
}
