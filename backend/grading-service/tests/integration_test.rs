// Integration tests for the grading service HTTP surface.
//
// Everything here runs against an in-process actix app with the model path
// pointed at a temp directory; no database or network is required. The
// fetch-training-data path needs a live PostgreSQL and stays ignored.

use actix_web::{test, web, App};
use serde_json::{json, Value};

use grading_service::handlers::{fetch_training_data, grade, health, train};
use grading_service::services::GradingEngine;

fn training_records(n: usize) -> Value {
    let tasks: Vec<Value> = (0..n)
        .map(|i| {
            json!({
                "question": "What is the capital of France?",
                "answer": vec!["paris"; 2 + i * 3].join(" "),
                "aiScore": if i % 2 == 0 { Some(50.0 + i as f64) } else { None },
                "aiFeedback": "earlier automated feedback",
                "teacherScore": 20.0 + (i as f64 * 11.0) % 70.0,
                "teacherFeedback": "teacher feedback"
            })
        })
        .collect();
    json!({ "gradingTasks": tasks })
}

#[actix_web::test]
async fn test_grade_without_model_uses_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let engine = web::Data::new(GradingEngine::new(dir.path().join("grading_model.bin")));
    let app = test::init_service(App::new().app_data(engine).service(grade)).await;

    let req = test::TestRequest::post()
        .uri("/api/grade")
        .set_json(json!({
            "question": "What is 2+2?",
            "answer": "The answer is four.",
            "maxScore": 10
        }))
        .to_request();

    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["success"], json!(true));
    // 4 words: round(min(70, 4 / 50 * 100)) = 8, within the 10-point max.
    assert_eq!(body["score"], json!(8));
    assert_eq!(
        body["feedback"],
        json!("โมเดล ML ยังไม่พร้อมใช้งาน ใช้การให้คะแนนแบบพื้นฐาน")
    );
    assert_eq!(body["confidence"], json!(0.5));
}

#[actix_web::test]
async fn test_grade_rejects_missing_fields() {
    let dir = tempfile::tempdir().unwrap();
    let engine = web::Data::new(GradingEngine::new(dir.path().join("grading_model.bin")));
    let app = test::init_service(App::new().app_data(engine).service(grade)).await;

    let req = test::TestRequest::post()
        .uri("/api/grade")
        .set_json(json!({ "question": "", "answer": "something" }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("กรุณาระบุคำถามและคำตอบ"));
}

#[actix_web::test]
async fn test_train_with_too_few_records_fails() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("grading_model.bin");
    let engine = web::Data::new(GradingEngine::new(model_path.clone()));
    let app = test::init_service(App::new().app_data(engine).service(train)).await;

    let req = test::TestRequest::post()
        .uri("/api/train")
        .set_json(training_records(4))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], json!(false));
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("พบ 4"), "unexpected message: {error}");

    // Nothing was persisted.
    assert!(!model_path.exists());
}

#[actix_web::test]
async fn test_train_with_empty_payload_fails() {
    let dir = tempfile::tempdir().unwrap();
    let engine = web::Data::new(GradingEngine::new(dir.path().join("grading_model.bin")));
    let app = test::init_service(App::new().app_data(engine).service(train)).await;

    let req = test::TestRequest::post()
        .uri("/api/train")
        .set_json(json!({ "gradingTasks": [] }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], json!("ไม่มีข้อมูลสำหรับเทรนโมเดล"));
}

#[actix_web::test]
async fn test_train_persists_and_switches_off_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("grading_model.bin");
    let engine = web::Data::new(GradingEngine::new(model_path.clone()));
    let app = test::init_service(
        App::new()
            .app_data(engine)
            .service(grade)
            .service(train)
            .service(health),
    )
    .await;

    // Untrained service reports no model.
    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["model_loaded"], json!(false));
    assert_eq!(body["service"], json!("grading-service"));

    // Train on five records with distinct teacher scores.
    let req = test::TestRequest::post()
        .uri("/api/train")
        .set_json(training_records(5))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["success"], json!(true));
    assert_eq!(body["samples"], json!(5));
    assert!(body["accuracy"].as_f64().unwrap().is_finite());
    assert!(model_path.exists());

    // The engine picked the bundle up.
    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["model_loaded"], json!(true));

    // Grading now runs through the model, not the word-count heuristic.
    let req = test::TestRequest::post()
        .uri("/api/grade")
        .set_json(json!({
            "question": "What is the capital of France?",
            "answer": "paris paris paris paris paris",
            "maxScore": 100
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["success"], json!(true));
    assert!(body["score"].as_u64().unwrap() <= 100);
    assert_eq!(body["confidence"], json!(0.8));
    assert_ne!(
        body["feedback"],
        json!("โมเดล ML ยังไม่พร้อมใช้งาน ใช้การให้คะแนนแบบพื้นฐาน")
    );
}

#[actix_web::test]
async fn test_max_score_defaults_to_one_hundred() {
    let dir = tempfile::tempdir().unwrap();
    let engine = web::Data::new(GradingEngine::new(dir.path().join("grading_model.bin")));
    let app = test::init_service(App::new().app_data(engine).service(grade)).await;

    // 100 words saturate the heuristic at 70 of the default 100-point max.
    let req = test::TestRequest::post()
        .uri("/api/grade")
        .set_json(json!({
            "question": "Describe the water cycle",
            "answer": vec!["word"; 100].join(" ")
        }))
        .to_request();

    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["score"], json!(70));
}

#[actix_web::test]
#[ignore] // Needs a PostgreSQL with the grading schema; run with DATABASE_URL set.
async fn test_fetch_training_data_from_store() {
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL required for this test");
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("database should be reachable");

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(pool))
            .service(fetch_training_data),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/fetch-training-data")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["success"], json!(true));
    assert_eq!(
        body["count"].as_u64().unwrap() as usize,
        body["data"].as_array().unwrap().len()
    );
}
