mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{employee, manager, TestApp};

#[tokio::test]
async fn customer_lifecycle() -> Result<()> {
    let app = TestApp::new();
    let mgr = manager("mgr");

    let res = app
        .send(Method::POST, "/customers", Some(&mgr), Some(json!({"name": "Acme", "_id": "forced", "__v": 9})))
        .await?;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["message"], "Customer created");
    let id = res.body["resourceData"]["_id"].as_str().unwrap().to_string();
    assert_ne!(id, "forced");

    let res = app.get(&format!("/customers/{}", id), &mgr).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["resourceData"]["name"], "Acme");
    assert_eq!(res.body["resourceData"]["ownerId"], "mgr");

    let res = app
        .send(
            Method::PUT,
            &format!("/customers/{}", id),
            Some(&mgr),
            Some(json!({"name": "Acme Ltd", "ownerId": "thief", "createdAt": "1970"})),
        )
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["resourceData"]["name"], "Acme Ltd");
    assert_eq!(res.body["resourceData"]["ownerId"], "mgr");
    assert_ne!(res.body["resourceData"]["createdAt"], "1970");

    let res = app.send(Method::DELETE, &format!("/customers/{}", id), Some(&mgr), None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "Customer deleted");

    let res = app.get(&format!("/customers/{}", id), &mgr).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn list_envelope_carries_paging() -> Result<()> {
    let app = TestApp::new();
    for n in 0..5 {
        app.seed("announcements", json!({"title": format!("news {}", n)})).await?;
    }

    let res = app.get("/announcements?limit=2", &manager("mgr")).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "Announcement list retrieved");
    assert_eq!(res.body["resourceData"].as_array().unwrap().len(), 2);
    assert_eq!(res.body["pages"], 3);
    assert_eq!(res.body["totalDocuments"], 5);
    Ok(())
}

#[tokio::test]
async fn missing_documents_are_404() -> Result<()> {
    let app = TestApp::new();
    let mgr = manager("mgr");

    let res = app.get("/comments/does-not-exist", &mgr).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["code"], "NOT_FOUND");

    let res = app
        .send(Method::PATCH, "/comments/does-not-exist", Some(&mgr), Some(json!({"text": "x"})))
        .await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.send(Method::DELETE, "/comments/does-not-exist", Some(&mgr), None).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn bodies_must_be_objects_with_changes() -> Result<()> {
    let app = TestApp::new();
    let mgr = manager("mgr");

    let res = app.send(Method::POST, "/notes", Some(&mgr), Some(json!(["not", "an", "object"]))).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let note = app.seed("notes", json!({"ownerId": "mgr", "text": "a"})).await?;
    let uri = format!("/notes/{}", note["_id"].as_str().unwrap());
    let res = app.send(Method::PUT, &uri, Some(&mgr), Some(json!({"_id": "other"}))).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn shared_resources_skip_ownership() -> Result<()> {
    let app = TestApp::new();
    let product = app.seed("products", json!({"ownerId": "mgr-1", "name": "Drill"})).await?;
    let uri = format!("/products/{}", product["_id"].as_str().unwrap());

    // Admins may edit shared records they did not create.
    let admin = common::token("adm", &[opshub_api::auth::Role::Admin]);
    let res = app.send(Method::PATCH, &uri, Some(&admin), Some(json!({"name": "Hammer drill"}))).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["resourceData"]["name"], "Hammer drill");
    Ok(())
}

#[tokio::test]
async fn employee_created_documents_show_up_in_their_list() -> Result<()> {
    let app = TestApp::new();
    let caller = employee("emp-4");

    for text in ["one", "two"] {
        let res = app.send(Method::POST, "/comments", Some(&caller), Some(json!({"text": text}))).await?;
        assert_eq!(res.status, StatusCode::CREATED);
    }
    app.seed("comments", json!({"ownerId": "emp-5", "text": "other"})).await?;

    let res = app.get("/comments/user", &caller).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["totalDocuments"], 2);
    assert_eq!(res.body["pages"], 1);
    Ok(())
}
