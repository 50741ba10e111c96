use anyhow::Result;
use expense_shield::{
    client::ApiClient,
    models::{GaslessSubmission, ProofSubmission},
};
use std::time::Duration;

/// Hash accepted by the mock on-chain check.
const VALID_TX_HASH: &str = "0xTEST_VALID";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();

    let base_url = std::env::var("EXPENSE_SHIELD_URL")
        .unwrap_or_else(|_| "http://localhost:3000".to_string());
    let upi_id = std::env::var("AGENT_UPI_ID").unwrap_or_else(|_| "sandeep@okaxis".to_string());
    let wallet = std::env::var("AGENT_WALLET")
        .unwrap_or_else(|_| "0x000000000000000000000000000000000000a9e7".to_string());

    println!("ExpenseShield Verify Agent");
    println!("==========================");
    println!("Server: {}", base_url);
    println!();

    let client = ApiClient::new(&base_url);

    let health = client.health().await?;
    println!("[1] Health: {} (db: {:?})", health.status, health.db_state);

    println!("[2] Verifying receipt for {}...", upi_id);
    let verified = client.verify(&upi_id, "BANKREF-0001").await?;
    println!(
        "   [OK] Receipt {} is {:?}, tx {}",
        verified.data.id,
        verified.data.status,
        verified.data.tx_hash.as_deref().unwrap_or("-")
    );

    let user = client.register_user("Verify Agent", &wallet).await?;
    println!("[3] Registered as user {} ({})", user.id, user.wallet_address);

    println!("[4] Submitting expense proof...");
    let proof = client
        .submit_proof(&ProofSubmission {
            user_id: user.id,
            tx_hash: VALID_TX_HASH.to_string(),
            chain_id: "ETH".to_string(),
            amount_wei: "50000000000000000".to_string(),
            metadata_info: Some("Agent submission".to_string()),
        })
        .await?;
    println!("   [OK] Proof {} submitted ({:?})", proof.id, proof.status);

    println!("[5] Waiting for on-chain verification...");
    match client
        .wait_for_settlement(proof.id, 10, Duration::from_secs(1))
        .await
    {
        Ok(settled) => println!(
            "   [OK] Proof {:?}, USD value {:?}",
            settled.status, settled.amount_usd
        ),
        Err(e) => println!("   [FAILED] {}", e),
    }

    println!("[6] Submitting gasless proof via relayer...");
    let relayed = client
        .submit_gasless(&GaslessSubmission {
            user_id: user.id,
            tx_hash: "0xbeef".to_string(),
            signature: "0xagent-signature".to_string(),
            proof_data: "0x".to_string(),
            chain_id: "FLR".to_string(),
            amount_wei: "2".to_string(),
        })
        .await?;
    println!("   [OK] Relayed proof {} is {:?}", relayed.id, relayed.status);

    println!("[7] Attesting VPA {}...", upi_id);
    let attested = client.verify_upi(&upi_id).await?;
    println!(
        "   [OK] {} -> {:?} (record {})",
        attested.validation.status_message,
        attested.attestation.attestation_status,
        attested.record_id
    );

    let history = client.history(user.id).await?;
    println!();
    println!("Found {} proofs in history.", history.len());

    Ok(())
}
