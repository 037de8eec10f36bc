use yatube::models::{CreateGroup, CreateUser, PostInput};
use yatube::services::posts::PostFilter;
use yatube::services::{auth, comments, groups, posts};
use yatube::Database;

fn create_test_db() -> Database {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let id: u32 = rng.gen();
    let name = format!("test_db_{}", id);

    let db = Database::open_memory(&name).expect("Failed to create test database");
    db.migrate().expect("Failed to run migrations");
    db
}

const TEST_PASSWORD: &str = "Password123";
const WRONG_PASSWORD: &str = "WrongPass456";

fn create_user(db: &Database, username: &str) -> i64 {
    auth::create_user(
        db,
        &CreateUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            first_name: String::new(),
            last_name: String::new(),
            password: TEST_PASSWORD.to_string(),
        },
    )
    .expect("Failed to create user")
}

fn create_group(db: &Database, title: &str, slug: &str) -> i64 {
    groups::create_group(
        db,
        CreateGroup {
            title: title.to_string(),
            slug: Some(slug.to_string()),
            description: "Тестовое описание".to_string(),
        },
    )
    .expect("Failed to create group")
}

fn create_post(db: &Database, author_id: i64, text: &str, group_id: Option<i64>) -> i64 {
    posts::create_post(
        db,
        PostInput {
            text: text.to_string(),
            group_id,
            image: None,
        },
        author_id,
    )
    .expect("Failed to create post")
}

mod auth_integration_tests {
    use super::*;

    #[test]
    fn test_create_and_authenticate_user() {
        let db = create_test_db();

        let user_id = create_user(&db, "auth");
        assert!(user_id > 0);

        let user = auth::authenticate(&db, "auth", TEST_PASSWORD)
            .expect("Authentication error")
            .expect("User should be found");

        assert_eq!(user.username, "auth");
        assert_eq!(user.email, "auth@example.com");
    }

    #[test]
    fn test_authenticate_wrong_password() {
        let db = create_test_db();
        create_user(&db, "auth");

        let result = auth::authenticate(&db, "auth", WRONG_PASSWORD).expect("Authentication error");
        assert!(result.is_none());
    }

    #[test]
    fn test_authenticate_nonexistent_user() {
        let db = create_test_db();

        let result =
            auth::authenticate(&db, "nonexistent", TEST_PASSWORD).expect("Authentication error");
        assert!(result.is_none());
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let db = create_test_db();
        create_user(&db, "auth");

        let result = auth::create_user(
            &db,
            &CreateUser {
                username: "auth".to_string(),
                email: String::new(),
                first_name: String::new(),
                last_name: String::new(),
                password: TEST_PASSWORD.to_string(),
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_session_lifecycle() {
        let db = create_test_db();
        let user_id = create_user(&db, "auth");

        let token = auth::create_session(&db, user_id, 14).unwrap();
        let user = auth::validate_session(&db, &token)
            .unwrap()
            .expect("Session should be valid");
        assert_eq!(user.id, user_id);

        auth::delete_session(&db, &token).unwrap();
        assert!(auth::validate_session(&db, &token).unwrap().is_none());
    }

    #[test]
    fn test_expired_sessions_are_cleaned_up() {
        let db = create_test_db();
        let user_id = create_user(&db, "auth");

        let expired = auth::create_session(&db, user_id, -1).unwrap();
        let live = auth::create_session(&db, user_id, 1).unwrap();

        assert!(auth::validate_session(&db, &expired).unwrap().is_none());
        assert_eq!(auth::cleanup_expired_sessions(&db).unwrap(), 1);
        assert!(auth::validate_session(&db, &live).unwrap().is_some());
    }

    #[test]
    fn test_update_password() {
        let db = create_test_db();
        create_user(&db, "auth");

        auth::update_password(&db, "auth", "NewPass456").unwrap();
        assert!(auth::authenticate(&db, "auth", TEST_PASSWORD).unwrap().is_none());
        assert!(auth::authenticate(&db, "auth", "NewPass456").unwrap().is_some());
    }
}

mod signup_integration_tests {
    use super::*;
    use yatube::web::forms::SignupForm;

    fn signup_input(username: &str) -> CreateUser {
        CreateUser {
            username: username.to_string(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            password: TEST_PASSWORD.to_string(),
        }
    }

    #[test]
    fn test_register_creates_account() {
        let db = create_test_db();
        let user_id = SignupForm::register(&db, &signup_input("newbie"))
            .unwrap()
            .expect("Registration should succeed");

        let user = auth::get_user_by_username(&db, "newbie").unwrap().unwrap();
        assert_eq!(user.id, user_id);
    }

    #[test]
    fn test_register_taken_username_is_a_field_error() {
        let db = create_test_db();
        // both signups passed clean before either was stored
        let first = SignupForm::register(&db, &signup_input("racer")).unwrap();
        let second = SignupForm::register(&db, &signup_input("racer")).unwrap();

        assert!(first.is_ok());
        let errors = second.expect_err("Second signup should be rejected");
        assert_eq!(
            errors.get("username"),
            Some(&["A user with that username already exists.".to_string()][..])
        );
    }
}

mod group_integration_tests {
    use super::*;

    #[test]
    fn test_create_group_with_explicit_slug() {
        let db = create_test_db();
        let id = create_group(&db, "Тестовая группа", "test-slug");

        let group = groups::get_group_by_slug(&db, "test-slug")
            .unwrap()
            .expect("Group should exist");
        assert_eq!(group.id, id);
        assert_eq!(group.title, "Тестовая группа");
        assert_eq!(group.description, "Тестовое описание");
    }

    #[test]
    fn test_create_group_derives_slug_from_title() {
        let db = create_test_db();
        let id = groups::create_group(
            &db,
            CreateGroup {
                title: "З".repeat(200),
                slug: None,
                description: String::new(),
            },
        )
        .unwrap();

        let group = groups::get_group(&db, id).unwrap().unwrap();
        assert_eq!(group.slug, "z".repeat(100));
    }

    #[test]
    fn test_duplicate_slug_rejected() {
        let db = create_test_db();
        create_group(&db, "Первая", "same");

        let result = groups::create_group(
            &db,
            CreateGroup {
                title: "Вторая".to_string(),
                slug: Some("same".to_string()),
                description: String::new(),
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_title_too_long_rejected() {
        let db = create_test_db();
        let result = groups::create_group(
            &db,
            CreateGroup {
                title: "т".repeat(201),
                slug: None,
                description: String::new(),
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_slug_is_none() {
        let db = create_test_db();
        assert!(groups::get_group_by_slug(&db, "missing").unwrap().is_none());
    }

    #[test]
    fn test_deleting_group_keeps_posts() {
        let db = create_test_db();
        let user_id = create_user(&db, "auth");
        let group_id = create_group(&db, "Группа", "group");
        let post_id = create_post(&db, user_id, "Пост в группе", Some(group_id));

        assert!(groups::delete_group(&db, "group").unwrap());

        let post = posts::get_post(&db, post_id)
            .unwrap()
            .expect("Post should survive its group");
        assert_eq!(post.group_id, None);
    }
}

mod post_integration_tests {
    use super::*;

    #[test]
    fn test_create_and_get_post() {
        let db = create_test_db();
        let user_id = create_user(&db, "auth");
        let group_id = create_group(&db, "Тестовая группа", "test-slug");

        let id = create_post(&db, user_id, "Тестовый текст", Some(group_id));

        let post = posts::get_post_with_relations(&db, id)
            .unwrap()
            .expect("Post should exist");
        assert_eq!(post.post.text, "Тестовый текст");
        assert_eq!(post.author.username, "auth");
        assert_eq!(post.group.as_ref().map(|g| g.slug.as_str()), Some("test-slug"));
        assert!(!post.post.pub_date.is_empty());
    }

    #[test]
    fn test_empty_text_rejected() {
        let db = create_test_db();
        let user_id = create_user(&db, "auth");

        let result = posts::create_post(
            &db,
            PostInput {
                text: "   ".to_string(),
                ..Default::default()
            },
            user_id,
        );
        assert!(result.is_err());
        assert_eq!(posts::count_posts(&db, PostFilter::All).unwrap(), 0);
    }

    #[test]
    fn test_unknown_post_is_none() {
        let db = create_test_db();
        assert!(posts::get_post(&db, 9999).unwrap().is_none());
        assert!(posts::get_post_with_relations(&db, 9999).unwrap().is_none());
    }

    #[test]
    fn test_listing_is_newest_first() {
        let db = create_test_db();
        let user_id = create_user(&db, "auth");

        let first = create_post(&db, user_id, "Первый", None);
        let second = create_post(&db, user_id, "Второй", None);
        let third = create_post(&db, user_id, "Третий", None);

        let conn = db.get().unwrap();
        for (id, date) in [
            (first, "2024-01-01T00:00:00.000000Z"),
            (second, "2024-01-02T00:00:00.000000Z"),
            (third, "2024-01-03T00:00:00.000000Z"),
        ] {
            conn.execute("UPDATE posts SET pub_date = ? WHERE id = ?", (date, id))
                .unwrap();
        }
        drop(conn);

        let listed: Vec<i64> = posts::list_posts(&db, PostFilter::All, 10, 0)
            .unwrap()
            .into_iter()
            .map(|p| p.post.id)
            .collect();
        assert_eq!(listed, vec![third, second, first]);
    }

    #[test]
    fn test_equal_timestamps_keep_insertion_order() {
        let db = create_test_db();
        let user_id = create_user(&db, "auth");

        let ids: Vec<i64> = (0..3)
            .map(|i| create_post(&db, user_id, &format!("Пост {}", i), None))
            .collect();

        let conn = db.get().unwrap();
        conn.execute("UPDATE posts SET pub_date = '2024-01-01T00:00:00.000000Z'", [])
            .unwrap();
        drop(conn);

        let listed: Vec<i64> = posts::list_posts(&db, PostFilter::All, 10, 0)
            .unwrap()
            .into_iter()
            .map(|p| p.post.id)
            .collect();
        assert_eq!(listed, ids);
    }

    #[test]
    fn test_filters_by_group_and_author() {
        let db = create_test_db();
        let auth_id = create_user(&db, "auth");
        let other_id = create_user(&db, "other");
        let group_id = create_group(&db, "Группа", "group");
        let empty_group = create_group(&db, "Пустая", "empty");

        create_post(&db, auth_id, "В группе", Some(group_id));
        create_post(&db, auth_id, "Без группы", None);
        create_post(&db, other_id, "Чужой пост", Some(group_id));

        assert_eq!(posts::count_posts(&db, PostFilter::All).unwrap(), 3);
        assert_eq!(posts::count_posts(&db, PostFilter::Group(group_id)).unwrap(), 2);
        assert_eq!(posts::count_posts(&db, PostFilter::Group(empty_group)).unwrap(), 0);
        assert_eq!(posts::count_posts(&db, PostFilter::Author(auth_id)).unwrap(), 2);

        let in_group = posts::list_posts(&db, PostFilter::Group(group_id), 10, 0).unwrap();
        assert!(in_group.iter().all(|p| p.post.group_id == Some(group_id)));

        let by_other = posts::list_posts(&db, PostFilter::Author(other_id), 10, 0).unwrap();
        assert_eq!(by_other.len(), 1);
        assert_eq!(by_other[0].author.username, "other");
    }

    #[test]
    fn test_limit_and_offset() {
        let db = create_test_db();
        let user_id = create_user(&db, "auth");
        for i in 0..13 {
            create_post(&db, user_id, &format!("Пост {}", i), None);
        }

        assert_eq!(posts::list_posts(&db, PostFilter::All, 10, 0).unwrap().len(), 10);
        assert_eq!(posts::list_posts(&db, PostFilter::All, 3, 10).unwrap().len(), 3);
    }

    #[test]
    fn test_update_keeps_author_and_pub_date() {
        let db = create_test_db();
        let user_id = create_user(&db, "auth");
        let group_id = create_group(&db, "Группа", "group");
        let id = create_post(&db, user_id, "Старый текст", None);
        let before = posts::get_post(&db, id).unwrap().unwrap();

        posts::update_post(
            &db,
            id,
            PostInput {
                text: "Новый текст".to_string(),
                group_id: Some(group_id),
                image: None,
            },
        )
        .unwrap();

        let after = posts::get_post(&db, id).unwrap().unwrap();
        assert_eq!(after.text, "Новый текст");
        assert_eq!(after.group_id, Some(group_id));
        assert_eq!(after.author_id, before.author_id);
        assert_eq!(after.pub_date, before.pub_date);
    }

    #[test]
    fn test_update_missing_post_fails() {
        let db = create_test_db();
        let result = posts::update_post(
            &db,
            42,
            PostInput {
                text: "Текст".to_string(),
                ..Default::default()
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_deleting_author_removes_posts_and_comments() {
        let db = create_test_db();
        let auth_id = create_user(&db, "auth");
        let other_id = create_user(&db, "other");
        let post_id = create_post(&db, auth_id, "Пост", None);
        let other_post = create_post(&db, other_id, "Другой пост", None);
        comments::create_comment(&db, other_post, auth_id, "Комментарий").unwrap();

        assert!(auth::delete_user(&db, auth_id).unwrap());

        assert!(posts::get_post(&db, post_id).unwrap().is_none());
        assert!(comments::list_comments(&db, other_post).unwrap().is_empty());
        assert!(posts::get_post(&db, other_post).unwrap().is_some());
    }
}

mod comment_integration_tests {
    use super::*;

    #[test]
    fn test_comments_listed_oldest_first() {
        let db = create_test_db();
        let auth_id = create_user(&db, "auth");
        let reader_id = create_user(&db, "reader");
        let post_id = create_post(&db, auth_id, "Пост", None);

        comments::create_comment(&db, post_id, reader_id, "Первый").unwrap();
        comments::create_comment(&db, post_id, auth_id, "Второй").unwrap();

        let listed = comments::list_comments(&db, post_id).unwrap();
        let texts: Vec<&str> = listed.iter().map(|c| c.comment.text.as_str()).collect();
        assert_eq!(texts, vec!["Первый", "Второй"]);
        assert_eq!(listed[0].author.username, "reader");
    }

    #[test]
    fn test_empty_comment_rejected() {
        let db = create_test_db();
        let user_id = create_user(&db, "auth");
        let post_id = create_post(&db, user_id, "Пост", None);

        assert!(comments::create_comment(&db, post_id, user_id, "  ").is_err());
        assert!(comments::list_comments(&db, post_id).unwrap().is_empty());
    }

    #[test]
    fn test_deleting_post_removes_comments() {
        let db = create_test_db();
        let user_id = create_user(&db, "auth");
        let post_id = create_post(&db, user_id, "Пост", None);
        comments::create_comment(&db, post_id, user_id, "Комментарий").unwrap();

        let conn = db.get().unwrap();
        conn.execute("DELETE FROM posts WHERE id = ?", [post_id]).unwrap();
        drop(conn);

        assert!(comments::list_comments(&db, post_id).unwrap().is_empty());
    }
}

mod database_integration_tests {
    use super::*;

    #[test]
    fn test_migrate_is_idempotent() {
        let db = create_test_db();
        let version = db.schema_version().unwrap();
        assert!(version >= 1);

        db.migrate().unwrap();
        assert_eq!(db.schema_version().unwrap(), version);
    }
}
