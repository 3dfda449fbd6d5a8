mod common;

use collabhub_server::{
    domain::ViewerRole,
    error::AppError,
    services::{
        applications::ApplicationManager, lifecycle::ProjectStatusController,
        messages::MessageService, realtime::RoomRegistry,
    },
};
use common::{bid, create_project, create_user, test_db};

#[tokio::test]
async fn participants_exchange_messages_in_order() {
    let db = test_db().await;
    let client = create_user(&db, "Client").await;
    let freelancer = create_user(&db, "Freelancer").await;
    let outsider = create_user(&db, "Outsider").await;
    let project_id = create_project(&db, &client, "Storefront").await;

    let service = MessageService::new(db.pool.clone(), RoomRegistry::new());

    // No freelancer yet.
    let result = service.send(&project_id, &client, "hello?").await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let application = ApplicationManager::new(db.pool.clone())
        .submit(&project_id, &freelancer, bid(300.0))
        .await
        .unwrap();
    ProjectStatusController::new(db.pool.clone())
        .accept_application(&application.id, &project_id, &client)
        .await
        .unwrap();

    service.send(&project_id, &client, "Welcome aboard").await.unwrap();
    service
        .send(&project_id, &freelancer, "  Thanks, starting today  ")
        .await
        .unwrap();

    let messages = service.list(&project_id, &freelancer).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "Welcome aboard");
    assert_eq!(messages[0].sender_name.as_deref(), Some("Client"));
    assert_eq!(messages[1].content, "Thanks, starting today");

    let result = service.list(&project_id, &outsider).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
    let result = service.send(&project_id, &outsider, "let me in").await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    let result = service.send(&project_id, &client, "   ").await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn conversations_show_the_partner() {
    let db = test_db().await;
    let client = create_user(&db, "Client").await;
    let freelancer = create_user(&db, "Freelancer").await;
    let project_id = create_project(&db, &client, "Newsletter").await;
    create_project(&db, &client, "Still open").await;

    let application = ApplicationManager::new(db.pool.clone())
        .submit(&project_id, &freelancer, bid(120.0))
        .await
        .unwrap();
    ProjectStatusController::new(db.pool.clone())
        .accept_application(&application.id, &project_id, &client)
        .await
        .unwrap();

    let service = MessageService::new(db.pool.clone(), RoomRegistry::new());

    let for_client = service.conversations(&client).await.unwrap();
    assert_eq!(for_client.len(), 1);
    assert_eq!(for_client[0].project_id, project_id);
    assert_eq!(for_client[0].role, ViewerRole::Client);
    assert_eq!(for_client[0].partner_name.as_deref(), Some("Freelancer"));

    let for_freelancer = service.conversations(&freelancer).await.unwrap();
    assert_eq!(for_freelancer.len(), 1);
    assert_eq!(for_freelancer[0].role, ViewerRole::Freelancer);
    assert_eq!(for_freelancer[0].partner_name.as_deref(), Some("Client"));
}

#[tokio::test]
async fn sent_messages_reach_room_subscribers() {
    let db = test_db().await;
    let client = create_user(&db, "Client").await;
    let freelancer = create_user(&db, "Freelancer").await;
    let project_id = create_project(&db, &client, "Podcast").await;

    let application = ApplicationManager::new(db.pool.clone())
        .submit(&project_id, &freelancer, bid(75.0))
        .await
        .unwrap();
    ProjectStatusController::new(db.pool.clone())
        .accept_application(&application.id, &project_id, &client)
        .await
        .unwrap();

    let rooms = RoomRegistry::new();
    let mut rx = rooms.subscribe(&project_id).await;
    let service = MessageService::new(db.pool.clone(), rooms);

    let sent = service
        .send(&project_id, &freelancer, "First draft is up")
        .await
        .unwrap();

    let pushed = rx.recv().await.unwrap();
    assert_eq!(pushed.id, sent.id);
    assert_eq!(pushed.content, "First draft is up");
    assert_eq!(pushed.sender_name.as_deref(), Some("Freelancer"));
}
