#[cfg(test)]
mod tests {
    use axum::{Json, Router, routing::post};
    use haven_chain::*;
    use serde_json::{Value, json};

    const CONTRACT: &str = "0x933bF9dbBe7ccff543Abb2C5878Fb879618182C8";
    const SHELTER_A: &str = "0x7C6461Aa79DD6eEb22191c68d37F3E5a22763112";
    const SHELTER_B: &str = "0x0396e77cC09293C5E61E6058423928694f0C1D0b";

    /// Serve a fake JSON-RPC node on an ephemeral port and return its URL.
    async fn spawn_node() -> String {
        async fn rpc(Json(req): Json<Value>) -> Json<Value> {
            let id = req["id"].clone();
            let result = match req["method"].as_str() {
                Some("eth_getBalance") => json!("0x14d1120d7b160000"),
                Some("eth_getTransactionCount") => json!("0x7"),
                Some("eth_call") => {
                    let data = req["params"][0]["data"].as_str().unwrap_or_default();
                    if data.ends_with(&SHELTER_B[2..].to_lowercase()) {
                        return Json(json!({
                            "jsonrpc": "2.0", "id": id,
                            "error": {"code": 3, "message": "execution reverted"}
                        }));
                    }
                    let mut words = String::from("0x");
                    words.push_str(&format!("{:064x}", 1));
                    words.push_str(&format!("{:064x}", 500u64));
                    words.push_str(&format!("{:064x}", 1_700_000_000u64));
                    json!(words)
                }
                _ => {
                    return Json(json!({
                        "jsonrpc": "2.0", "id": id,
                        "error": {"code": -32601, "message": "method not found"}
                    }));
                }
            };
            Json(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, Router::new().route("/", post(rpc))).await.unwrap();
        });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn test_rpc_client_reads() {
        let client = RpcClient::new(spawn_node().await);
        assert_eq!(client.balance(CONTRACT).await.unwrap(), 1_500_000_000_000_000_000);
        assert_eq!(client.transaction_count(CONTRACT).await.unwrap(), 7);

        let approval = client.approved_shelter(CONTRACT, SHELTER_A).await.unwrap();
        assert!(approval.is_approved);
        assert_eq!(approval.monthly_allowance, 500);
        assert_eq!(approval.last_distribution_time, 1_700_000_000);
    }

    #[tokio::test]
    async fn test_rpc_error_surfaces_as_chain_error() {
        let client = RpcClient::new(spawn_node().await);
        let err = client.approved_shelter(CONTRACT, SHELTER_B).await.unwrap_err();
        assert!(err.to_string().contains("execution reverted"));

        let err = client.call("eth_chainId", json!([])).await.unwrap_err();
        assert!(err.to_string().contains("method not found"));
    }

    #[tokio::test]
    async fn test_stats_over_rpc_skips_failed_shelters() {
        let client = RpcClient::new(spawn_node().await);
        let stats = donation_stats(
            &client,
            CONTRACT,
            &[SHELTER_A.to_string(), SHELTER_B.to_string()],
        )
        .await
        .unwrap();
        assert_eq!(
            stats,
            DonationStats {
                balance: "1.5".into(),
                shelter_count: 1,
                donation_count: 7,
            }
        );
    }

    #[tokio::test]
    async fn test_stats_skips_garbled_shelter_address() {
        let client = RpcClient::new(spawn_node().await);
        let stats = donation_stats(
            &client,
            CONTRACT,
            &["0xaé1".to_string(), SHELTER_A.to_string()],
        )
        .await
        .unwrap();
        assert_eq!(stats.shelter_count, 1);
    }

    #[tokio::test]
    async fn test_stats_counts_unapproved_reads() {
        let chain = MockChain::new()
            .with_balance(CONTRACT, 0)
            .with_approval(
                SHELTER_A,
                ShelterApproval {
                    is_approved: false,
                    monthly_allowance: 0,
                    last_distribution_time: 0,
                },
            );
        let stats = donation_stats(&chain, CONTRACT, &[SHELTER_A.to_string()])
            .await
            .unwrap();
        assert_eq!(stats.shelter_count, 1);
        assert_eq!(stats.balance, "0");
    }

    #[tokio::test]
    async fn test_stats_fails_only_on_balance() {
        let chain = MockChain::new().failing(CONTRACT);
        assert!(donation_stats(&chain, CONTRACT, &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_stats_serializes_camel_case() {
        let stats = DonationStats {
            balance: "2".into(),
            shelter_count: 3,
            donation_count: 4,
        };
        assert_eq!(
            serde_json::to_value(stats).unwrap(),
            json!({"balance": "2", "shelterCount": 3, "donationCount": 4})
        );
    }

    #[tokio::test]
    async fn test_unreachable_node_is_chain_error() {
        let client = RpcClient::new("http://127.0.0.1:9/");
        assert!(matches!(
            client.balance(CONTRACT).await,
            Err(haven_core::HavenError::Chain(_))
        ));
    }
}
