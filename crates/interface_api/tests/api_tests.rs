//! HTTP tests for the claims assistant API

use std::time::Duration;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::{json, Value};

use interface_api::config::ApiConfig;
use interface_api::{create_router, AppState};
use test_utils::{memory_store, DocumentFixtures};

fn server_with(config: ApiConfig) -> TestServer {
    let state = AppState::with_store(memory_store(), config);
    TestServer::new(create_router(state)).unwrap()
}

fn server() -> TestServer {
    let mut config = ApiConfig::default();
    config.wizard.processing_delay_ms = 20;
    server_with(config)
}

fn standard_form() -> MultipartForm {
    MultipartForm::new()
        .add_part(
            "files",
            Part::bytes(DocumentFixtures::MEDICAL_RECORD.as_bytes().to_vec())
                .file_name("病历.txt")
                .mime_type("text/plain"),
        )
        .add_part(
            "files",
            Part::bytes(DocumentFixtures::INVOICE.as_bytes().to_vec())
                .file_name("发票.txt")
                .mime_type("text/plain"),
        )
        .add_part(
            "files",
            Part::bytes(DocumentFixtures::IDENTITY_CARD.as_bytes().to_vec())
                .file_name("身份证.txt")
                .mime_type("text/plain"),
        )
}

async fn upload(server: &TestServer) -> String {
    let response = server.post("/api/upload").multipart(standard_form()).await;
    response.assert_status_ok();
    let body: Value = response.json();
    body["claim_id"].as_str().unwrap().to_string()
}

/// Polls a claim until it reaches `status`
async fn wait_for_status(server: &TestServer, claim_id: &str, status: &str) -> Value {
    for _ in 0..100 {
        let claim: Value = server.get(&format!("/api/claims/{}", claim_id)).await.json();
        if claim["status"] == status {
            return claim;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("claim {} never reached {}", claim_id, status);
}

// ============================================================================
// Service endpoints
// ============================================================================

mod service_tests {
    use super::*;

    #[tokio::test]
    async fn test_root_banner() {
        let response = server().get("/").await;
        response.assert_status_ok();
        response.assert_json(&json!({"message": "保险理赔助手API服务正在运行"}));
    }

    #[tokio::test]
    async fn test_health_and_readiness() {
        let server = server();
        let health: Value = server.get("/health").await.json();
        assert_eq!(health["status"], "healthy");

        let response = server.get("/health/ready").await;
        response.assert_status_ok();
        let ready: Value = response.json();
        assert_eq!(ready["status"], "ready");
        assert_eq!(ready["store"]["adapter_id"], "memory-claim-store");
    }

    #[tokio::test]
    async fn test_request_id_header_is_set() {
        let response = server().get("/health").await;
        assert!(response.headers().contains_key("x-request-id"));
    }
}

// ============================================================================
// Claims
// ============================================================================

mod claims_tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_opens_claim() {
        let server = server();
        let response = server.post("/api/upload").multipart(standard_form()).await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["message"], "文档上传成功");
        assert_eq!(body["document_count"], 3);

        let claim_id = body["claim_id"].as_str().unwrap();
        let claim: Value = server.get(&format!("/api/claims/{}", claim_id)).await.json();
        assert_eq!(claim["status"], "uploaded");
        assert_eq!(claim["documents"][0]["filename"], "病历.txt");
    }

    #[tokio::test]
    async fn test_upload_without_files_is_rejected() {
        let form = MultipartForm::new().add_text("note", "nothing attached");
        let response = server().post("/api/upload").multipart(form).await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_claim_is_404() {
        let server = server();
        let unknown = uuid_like();

        for path in [
            format!("/api/claims/{}", unknown),
            format!("/api/reports/{}", unknown),
        ] {
            let response = server.get(&path).await;
            response.assert_status(StatusCode::NOT_FOUND);
            let body: Value = response.json();
            assert_eq!(body["error"], "not_found");
            assert_eq!(body["message"], "理赔记录不存在");
        }

        let response = server.post(&format!("/api/classify/{}", unknown)).await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_claim_id_is_400() {
        let response = server().get("/api/claims/not-an-id").await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_full_pipeline() {
        let server = server();
        let claim_id = upload(&server).await;

        let response = server.post(&format!("/api/classify/{}", claim_id)).await;
        response.assert_status(StatusCode::ACCEPTED);
        let accepted: Value = response.json();
        assert_eq!(accepted["message"], "文档分类任务已启动");

        let claim = wait_for_status(&server, &claim_id, "extracting").await;
        let types: Vec<&str> = claim["documents"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["document_type"].as_str().unwrap())
            .collect();
        assert_eq!(types, vec!["medical_record", "invoice", "identity_card"]);

        let response = server.post(&format!("/api/extract/{}", claim_id)).await;
        response.assert_status(StatusCode::ACCEPTED);
        let accepted: Value = response.json();
        assert_eq!(accepted["message"], "信息提取任务已启动");

        let claim = wait_for_status(&server, &claim_id, "evaluating").await;
        assert_eq!(claim["insured_person"], "张三");

        let response = server
            .post(&format!("/api/evaluate/{}", claim_id))
            .json(&json!({"contract_terms": "基本医疗保险"}))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        let evaluation = &body["liability_result"];
        assert_eq!(evaluation["product_code"], "health_insurance_basic");
        assert_eq!(evaluation["coverage_applicable"], true);
        assert!(evaluation["confidence"].as_f64().unwrap() >= 0.1);

        let report: Value = server.get(&format!("/api/reports/{}", claim_id)).await.json();
        assert_eq!(report["details"]["status"], "completed");
        assert_eq!(report["details"]["document_count"], 3);
    }

    #[tokio::test]
    async fn test_evaluate_before_classification_uses_default_product() {
        let server = server();
        let claim_id = upload(&server).await;

        let response = server.post(&format!("/api/evaluate/{}", claim_id)).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["liability_result"]["product_code"], "health_insurance_basic");
        // no extraction ran, so there is no diagnosis to cover
        assert_eq!(body["liability_result"]["coverage_applicable"], false);
    }

    #[tokio::test]
    async fn test_stage_out_of_order_is_conflict() {
        let server = server();
        let claim_id = upload(&server).await;

        server
            .post(&format!("/api/classify/{}", claim_id))
            .await
            .assert_status(StatusCode::ACCEPTED);
        wait_for_status(&server, &claim_id, "extracting").await;

        let response = server.post(&format!("/api/extract/{}", claim_id)).await;
        response.assert_status(StatusCode::ACCEPTED);
        wait_for_status(&server, &claim_id, "evaluating").await;

        let response = server.post(&format!("/api/classify/{}", claim_id)).await;
        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let server = server();
        let first = upload(&server).await;
        let second = upload(&server).await;

        let claims: Vec<Value> = server.get("/api/claims").await.json();
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0]["claim_id"], second.as_str());

        let filtered: Vec<Value> = server
            .get("/api/claims")
            .add_query_param("status", "completed")
            .await
            .json();
        assert!(filtered.is_empty());

        server
            .get("/api/claims")
            .add_query_param("limit", 0)
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

        server
            .delete(&format!("/api/claims/{}", first))
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .get(&format!("/api/claims/{}", first))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_body_limit() {
        let mut config = ApiConfig::default();
        config.upload.max_body_bytes = 64;
        let server = server_with(config);

        let response = server.post("/api/upload").multipart(standard_form()).await;
        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    }

    fn uuid_like() -> String {
        "0190c8a2-5b1e-7c3d-9f00-00000000ffff".to_string()
    }
}

// ============================================================================
// Upload wizard
// ============================================================================

mod wizard_tests {
    use super::*;

    async fn create(server: &TestServer) -> String {
        let response = server.post("/api/wizard").await;
        response.assert_status(StatusCode::CREATED);
        let snapshot: Value = response.json();
        assert_eq!(snapshot["step"], 0);
        assert_eq!(snapshot["steps"].as_array().unwrap().len(), 4);
        snapshot["session_id"].as_str().unwrap().to_string()
    }

    fn files(names: &[&str]) -> Value {
        json!({
            "files": names.iter().map(|n| json!({"name": n, "size": 2048})).collect::<Vec<_>>()
        })
    }

    #[tokio::test]
    async fn test_process_without_files_warns() {
        let server = server();
        let id = create(&server).await;

        let response = server.post(&format!("/api/wizard/{}/process", id)).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "no_files_selected");
        assert_eq!(body["message"], "请先上传文件");

        let snapshot: Value = server.get(&format!("/api/wizard/{}", id)).await.json();
        assert_eq!(snapshot["step"], 0);
        assert_eq!(snapshot["processing"], false);
    }

    #[tokio::test]
    async fn test_processing_shows_results_after_delay() {
        let server = server();
        let id = create(&server).await;

        server
            .put(&format!("/api/wizard/{}/files", id))
            .json(&files(&["a.pdf", "b.jpg", "c.png", "d.pdf"]))
            .await
            .assert_status_ok();

        let response = server.post(&format!("/api/wizard/{}/process", id)).await;
        response.assert_status(StatusCode::ACCEPTED);
        let snapshot: Value = response.json();
        assert_eq!(snapshot["processing"], true);
        assert_eq!(snapshot["show_results"], false);

        tokio::time::sleep(Duration::from_millis(150)).await;

        let snapshot: Value = server.get(&format!("/api/wizard/{}", id)).await.json();
        assert_eq!(snapshot["processing"], false);
        assert_eq!(snapshot["show_results"], true);
        assert_eq!(snapshot["step"], 3);

        let labels: Vec<&str> = snapshot["documents"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["document_type"].as_str().unwrap())
            .collect();
        assert_eq!(labels, vec!["病历", "发票", "身份证明", "病历"]);

        let fields = snapshot["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 6);
        assert_eq!(fields[0]["field_name"], "患者姓名");
        assert_eq!(fields[0]["field_value"], "张三");
    }

    #[tokio::test]
    async fn test_clearing_files_mid_run_keeps_started_rows() {
        let server = server();
        let id = create(&server).await;

        server
            .put(&format!("/api/wizard/{}/files", id))
            .json(&files(&["a.pdf", "b.jpg", "c.png"]))
            .await
            .assert_status_ok();
        server
            .post(&format!("/api/wizard/{}/process", id))
            .await
            .assert_status(StatusCode::ACCEPTED);
        server
            .put(&format!("/api/wizard/{}/files", id))
            .json(&json!({ "files": [] }))
            .await
            .assert_status_ok();

        tokio::time::sleep(Duration::from_millis(150)).await;

        let snapshot: Value = server.get(&format!("/api/wizard/{}", id)).await.json();
        assert_eq!(snapshot["show_results"], true);
        assert_eq!(snapshot["documents"].as_array().unwrap().len(), 3);
        assert!(snapshot["files"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reset_and_remove() {
        let server = server();
        let id = create(&server).await;

        server
            .put(&format!("/api/wizard/{}/files", id))
            .json(&files(&["a.pdf", "b.jpg"]))
            .await
            .assert_status_ok();

        let snapshot: Value = server
            .delete(&format!("/api/wizard/{}/files/a.pdf", id))
            .await
            .json();
        assert_eq!(snapshot["files"].as_array().unwrap().len(), 1);

        server
            .delete(&format!("/api/wizard/{}/files/missing.pdf", id))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let snapshot: Value = server.post(&format!("/api/wizard/{}/reset", id)).await.json();
        assert_eq!(snapshot["step"], 0);
        assert!(snapshot["files"].as_array().unwrap().is_empty());
        assert!(snapshot["documents"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_file_list_is_rejected() {
        let server = server();
        let id = create(&server).await;

        let response = server
            .put(&format!("/api/wizard/{}/files", id))
            .json(&files(&[""]))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_delete_session() {
        let server = server();
        let id = create(&server).await;

        server
            .delete(&format!("/api/wizard/{}", id))
            .await
            .assert_status(StatusCode::NO_CONTENT);
        let response = server.get(&format!("/api/wizard/{}", id)).await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["message"], "会话不存在");
    }
}
