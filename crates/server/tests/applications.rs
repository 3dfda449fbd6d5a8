mod common;

use collabhub_server::{
    domain::ApplicationStatus,
    error::AppError,
    services::{applications::ApplicationManager, lifecycle::ProjectStatusController},
};
use common::{bid, create_project, create_user, test_db};

#[tokio::test]
async fn clients_cannot_apply_to_their_own_project() {
    let db = test_db().await;
    let client = create_user(&db, "Client").await;
    let project_id = create_project(&db, &client, "Own project").await;

    let result = ApplicationManager::new(db.pool.clone())
        .submit(&project_id, &client, bid(100.0))
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn duplicate_applications_are_rejected() {
    let db = test_db().await;
    let client = create_user(&db, "Client").await;
    let freelancer = create_user(&db, "Freelancer").await;
    let project_id = create_project(&db, &client, "Data pipeline").await;

    let applications = ApplicationManager::new(db.pool.clone());
    applications
        .submit(&project_id, &freelancer, bid(100.0))
        .await
        .unwrap();

    let result = applications
        .submit(&project_id, &freelancer, bid(90.0))
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn freelancer_can_reapply_after_rejection() {
    let db = test_db().await;
    let client = create_user(&db, "Client").await;
    let freelancer = create_user(&db, "Freelancer").await;
    let project_id = create_project(&db, &client, "Chatbot").await;

    let applications = ApplicationManager::new(db.pool.clone());
    let first = applications
        .submit(&project_id, &freelancer, bid(100.0))
        .await
        .unwrap();
    ProjectStatusController::new(db.pool.clone())
        .reject_application(&first.id, &client)
        .await
        .unwrap();

    let second = applications
        .submit(&project_id, &freelancer, bid(80.0))
        .await
        .unwrap();
    assert_eq!(second.status, ApplicationStatus::Pending);
}

#[tokio::test]
async fn projects_that_left_open_take_no_bids() {
    let db = test_db().await;
    let client = create_user(&db, "Client").await;
    let first = create_user(&db, "First").await;
    let late = create_user(&db, "Late").await;
    let project_id = create_project(&db, &client, "Game").await;

    let applications = ApplicationManager::new(db.pool.clone());
    let application = applications
        .submit(&project_id, &first, bid(500.0))
        .await
        .unwrap();
    ProjectStatusController::new(db.pool.clone())
        .accept_application(&application.id, &project_id, &client)
        .await
        .unwrap();

    let result = applications.submit(&project_id, &late, bid(400.0)).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn bids_must_be_positive_with_a_proposal() {
    let db = test_db().await;
    let client = create_user(&db, "Client").await;
    let freelancer = create_user(&db, "Freelancer").await;
    let project_id = create_project(&db, &client, "Video edit").await;

    let applications = ApplicationManager::new(db.pool.clone());

    let result = applications
        .submit(&project_id, &freelancer, bid(0.0))
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let mut blank = bid(50.0);
    blank.proposal = "   ".to_string();
    let result = applications.submit(&project_id, &freelancer, blank).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn non_clients_only_see_their_own_bids() {
    let db = test_db().await;
    let client = create_user(&db, "Client").await;
    let first = create_user(&db, "First").await;
    let second = create_user(&db, "Second").await;
    let project_id = create_project(&db, &client, "Survey").await;

    let applications = ApplicationManager::new(db.pool.clone());
    let mine = applications
        .submit(&project_id, &first, bid(100.0))
        .await
        .unwrap();
    let theirs = applications
        .submit(&project_id, &second, bid(110.0))
        .await
        .unwrap();

    let for_client = applications
        .list_for_project(&project_id, &client)
        .await
        .unwrap();
    assert_eq!(for_client.len(), 2);
    // Newest first.
    assert_eq!(for_client[0].application.id, theirs.id);
    assert_eq!(for_client[0].freelancer.full_name.as_deref(), Some("Second"));

    let for_first = applications
        .list_for_project(&project_id, &first)
        .await
        .unwrap();
    assert_eq!(for_first.len(), 1);
    assert_eq!(for_first[0].application.id, mine.id);

    let result = applications.get(&theirs.id, &first).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    let own = applications.list_for_freelancer(&first).await.unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].project.title, "Survey");
}
