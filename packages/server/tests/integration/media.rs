use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde_json::{Value, json};

use crate::common::{TestApp, routes};
use classifieds_server::entity::media;

const JPG: &[u8] = b"\xFF\xD8\xFF\xE0 fake jpeg payload";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\n fake png payload";
const MOV: &[u8] = b"\x00\x00\x00\x14ftypqt   fake quicktime";

fn orders(items: &[Value]) -> Vec<i64> {
    items.iter().map(|m| m["order"].as_i64().unwrap()).collect()
}

fn ids(items: &[Value]) -> Vec<i32> {
    items.iter().map(|m| m["id"].as_i64().unwrap() as i32).collect()
}

async fn media_rows(app: &TestApp, listing_id: i32) -> u64 {
    media::Entity::find()
        .filter(media::Column::ListingId.eq(listing_id))
        .count(&app.db)
        .await
        .unwrap()
}

mod upload {
    use super::*;

    #[tokio::test]
    async fn owner_can_upload_files_to_a_listing() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;

        let res = app
            .upload_with_token(listing_id, &[("front.jpg", JPG), ("side.PNG", PNG)], &owner.token)
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["message"], "Files uploaded successfully!");
        let items = res.body["media"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["media_type"], "photo");
        assert_eq!(items[0]["mimetype"], "image/jpeg");
        assert_eq!(items[1]["file_extension"], "png");
        assert_eq!(items[0]["listing_id"], listing_id);
        assert_eq!(app.files_on_disk(listing_id), 2);
    }

    #[tokio::test]
    async fn stored_filename_is_generated_not_the_uploaded_name() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;

        let items = app
            .upload_ok(listing_id, &[("../../etc/passwd.jpg", JPG)], &owner.token)
            .await;

        let filename = items[0]["filename"].as_str().unwrap();
        assert!(!filename.contains("passwd"));
        assert!(!filename.contains('/'));
        assert!(filename.ends_with(".jpg"));
        assert_eq!(filename.len(), 36 + ".jpg".len());
    }

    #[tokio::test]
    async fn quicktime_upload_is_classified_as_video() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let listing_id = app.create_listing(&owner.token, "Telescope").await;

        let items = app
            .upload_ok(listing_id, &[("telescope.MOV", MOV)], &owner.token)
            .await;

        assert_eq!(items[0]["media_type"], "video");
        assert_eq!(items[0]["mimetype"], "video/quicktime");
        assert_eq!(items[0]["file_extension"], "mov");
        let url = items[0]["url"].as_str().unwrap();
        assert!(url.starts_with(&format!("/media/{listing_id}/video/")));
    }

    #[tokio::test]
    async fn new_media_is_appended_after_existing_media() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;

        let first = app
            .upload_ok(listing_id, &[("a.jpg", JPG), ("b.jpg", JPG)], &owner.token)
            .await;
        assert_eq!(orders(&first), vec![0, 1]);

        let second = app
            .upload_ok(
                listing_id,
                &[("c.jpg", JPG), ("d.png", PNG), ("e.mov", MOV)],
                &owner.token,
            )
            .await;
        assert_eq!(orders(&second), vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn uploaded_file_is_served_byte_for_byte_at_its_url() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;

        let items = app
            .upload_ok(listing_id, &[("front.jpg", JPG)], &owner.token)
            .await;
        let media_id = items[0]["id"].as_i64().unwrap() as i32;

        let descriptor = app.get_without_token(&routes::media(media_id)).await;
        assert_eq!(descriptor.status, 200);
        let url = descriptor.body["url"].as_str().unwrap().to_string();

        let (status, bytes) = app.get_bytes(&url).await;
        assert_eq!(status, 200);
        assert_eq!(bytes, JPG);
    }

    #[tokio::test]
    async fn disallowed_extension_is_rejected_without_side_effects() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;

        let res = app
            .upload_with_token(listing_id, &[("malware.exe", JPG)], &owner.token)
            .await;

        assert_eq!(res.status, 415);
        assert_eq!(res.body["code"], "UNSUPPORTED_MEDIA_TYPE");
        assert!(res.text.contains("exe"));
        assert_eq!(media_rows(&app, listing_id).await, 0);
        assert_eq!(app.files_on_disk(listing_id), 0);
    }

    #[tokio::test]
    async fn rejected_file_in_a_batch_discards_files_already_stored() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;

        let res = app
            .upload_with_token(
                listing_id,
                &[("ok.jpg", JPG), ("notes.txt", b"hello".as_slice())],
                &owner.token,
            )
            .await;

        assert_eq!(res.status, 415);
        assert_eq!(media_rows(&app, listing_id).await, 0);
        assert_eq!(app.files_on_disk(listing_id), 0);
    }

    #[tokio::test]
    async fn file_without_extension_is_rejected() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;

        let res = app
            .upload_with_token(listing_id, &[("README", JPG)], &owner.token)
            .await;

        assert_eq!(res.status, 415);
        assert_eq!(media_rows(&app, listing_id).await, 0);
    }

    #[tokio::test]
    async fn request_without_files_part_is_rejected() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;

        let res = app.upload_with_token(listing_id, &[], &owner.token).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn files_with_empty_names_are_rejected() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;

        let res = app
            .upload_with_token(listing_id, &[("", JPG)], &owner.token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["message"], "No selected file");
    }

    #[tokio::test]
    async fn one_empty_name_in_a_batch_rejects_the_whole_request() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;

        let res = app
            .upload_with_token(listing_id, &[("front.jpg", JPG), ("", JPG)], &owner.token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(res.body["message"], "No selected file for one of the uploads");
        assert_eq!(media_rows(&app, listing_id).await, 0);
        assert_eq!(app.files_on_disk(listing_id), 0);
    }

    #[tokio::test]
    async fn storage_failure_mid_batch_reports_error_and_keeps_nothing() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;

        // A regular file where the video directory belongs makes the second save fail.
        let listing_dir = app.media_root.join(listing_id.to_string());
        std::fs::create_dir_all(&listing_dir).unwrap();
        std::fs::write(listing_dir.join("video"), b"blocker").unwrap();

        let res = app
            .upload_with_token(
                listing_id,
                &[("front.jpg", JPG), ("clip.mov", MOV)],
                &owner.token,
            )
            .await;

        assert_eq!(res.status, 500);
        assert_eq!(res.body["code"], "STORAGE_ERROR");
        assert!(!res.text.contains(&app.media_root.display().to_string()));
        assert_eq!(media_rows(&app, listing_id).await, 0);

        let photos = std::fs::read_dir(listing_dir.join("photo")).unwrap().count();
        assert_eq!(photos, 0);
    }

    #[tokio::test]
    async fn exhausted_positions_are_a_server_error() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;
        media::ActiveModel {
            listing_id: Set(listing_id),
            filename: Set("last.jpg".into()),
            file_extension: Set("jpg".into()),
            mimetype: Set("image/jpeg".into()),
            media_type: Set("photo".into()),
            position: Set(i32::MAX),
            uploaded_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(&app.db)
        .await
        .unwrap();

        let res = app
            .upload_with_token(listing_id, &[("a.jpg", JPG)], &owner.token)
            .await;

        assert_eq!(res.status, 500);
        assert_eq!(res.body["code"], "INTERNAL_ERROR");
        assert_eq!(media_rows(&app, listing_id).await, 1);
        assert_eq!(app.files_on_disk(listing_id), 0);
    }

    #[tokio::test]
    async fn file_over_size_limit_is_rejected() {
        let app = TestApp::spawn_with(|c| c.storage.max_file_size = 8).await;
        let owner = app.create_user("alice").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;

        let res = app
            .upload_with_token(listing_id, &[("big.jpg", JPG)], &owner.token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(app.files_on_disk(listing_id), 0);
    }

    #[tokio::test]
    async fn non_owner_is_forbidden_regardless_of_file_validity() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let intruder = app.create_user("mallory").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;

        let valid = app
            .upload_with_token(listing_id, &[("a.jpg", JPG)], &intruder.token)
            .await;
        let invalid = app
            .upload_with_token(listing_id, &[("a.exe", JPG)], &intruder.token)
            .await;

        assert_eq!(valid.status, 403);
        assert_eq!(valid.body["code"], "PERMISSION_DENIED");
        assert_eq!(invalid.status, 403);
        assert_eq!(app.files_on_disk(listing_id), 0);
    }

    #[tokio::test]
    async fn upload_to_missing_listing_is_not_found() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;

        let res = app.upload_with_token(9999, &[("a.jpg", JPG)], &owner.token).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["message"], "Listing not found");
    }

    #[tokio::test]
    async fn upload_requires_authentication() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;

        let res = app
            .upload_with_token(listing_id, &[("a.jpg", JPG)], "not-a-token")
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }
}

mod reorder {
    use super::*;

    #[tokio::test]
    async fn swapping_two_items_updates_both() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;
        let items = app
            .upload_ok(listing_id, &[("a.jpg", JPG), ("b.jpg", JPG)], &owner.token)
            .await;
        let (id_a, id_b) = (ids(&items)[0], ids(&items)[1]);

        let res = app
            .put_with_token(
                &routes::media_order(listing_id),
                &json!({"media_ids": [id_b, id_a]}),
                &owner.token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["updated_count"], 2);
        assert_eq!(res.body["count_mismatch"], false);
        assert_eq!(
            res.body["message"],
            "Media order updated successfully. 2 items updated."
        );

        let listing = app.get_without_token(&routes::listing(listing_id)).await;
        let media = listing.body["media"].as_array().unwrap();
        assert_eq!(ids(media), vec![id_b, id_a]);
        assert_eq!(orders(media), vec![0, 1]);
    }

    #[tokio::test]
    async fn unchanged_positions_are_not_counted() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;
        let items = app
            .upload_ok(listing_id, &[("a.jpg", JPG), ("b.jpg", JPG)], &owner.token)
            .await;

        let res = app
            .put_with_token(
                &routes::media_order(listing_id),
                &json!({"media_ids": ids(&items)}),
                &owner.token,
            )
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["updated_count"], 0);
    }

    #[tokio::test]
    async fn ids_from_other_listings_are_skipped_and_left_untouched() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let mine = app.create_listing(&owner.token, "Bike").await;
        let other = app.create_listing(&owner.token, "Lamp").await;
        let my_items = app
            .upload_ok(mine, &[("a.jpg", JPG), ("b.jpg", JPG)], &owner.token)
            .await;
        let other_items = app
            .upload_ok(other, &[("x.jpg", JPG), ("y.jpg", JPG)], &owner.token)
            .await;
        let foreign = ids(&other_items)[1];

        let res = app
            .put_with_token(
                &routes::media_order(mine),
                &json!({"media_ids": [foreign, ids(&my_items)[1], ids(&my_items)[0]]}),
                &owner.token,
            )
            .await;

        // b already sits at index 1; only a moves.
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["updated_count"], 1);
        assert_eq!(res.body["count_mismatch"], true);

        let foreign_row = app.get_without_token(&routes::media(foreign)).await;
        assert_eq!(foreign_row.body["order"], 1);
        assert_eq!(foreign_row.body["listing_id"], other);
    }

    #[tokio::test]
    async fn ids_beyond_the_key_range_are_skipped() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;
        let items = app
            .upload_ok(listing_id, &[("a.jpg", JPG), ("b.jpg", JPG)], &owner.token)
            .await;
        let [a, b] = [ids(&items)[0], ids(&items)[1]];

        let res = app
            .put_with_token(
                &routes::media_order(listing_id),
                &json!({"media_ids": [3_000_000_000_i64, b, a]}),
                &owner.token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["updated_count"], 1);
        assert_eq!(res.body["count_mismatch"], true);

        let listing = app.get_without_token(&routes::listing(listing_id)).await;
        let media = listing.body["media"].as_array().unwrap();
        assert_eq!(ids(media), vec![b, a]);
    }

    #[tokio::test]
    async fn partial_list_is_applied_with_mismatch_flag() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;
        let items = app
            .upload_ok(
                listing_id,
                &[("a.jpg", JPG), ("b.jpg", JPG), ("c.jpg", JPG)],
                &owner.token,
            )
            .await;

        let res = app
            .put_with_token(
                &routes::media_order(listing_id),
                &json!({"media_ids": [ids(&items)[2]]}),
                &owner.token,
            )
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["updated_count"], 1);
        assert_eq!(res.body["count_mismatch"], true);
    }

    #[tokio::test]
    async fn missing_media_ids_is_rejected() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;

        let res = app
            .put_with_token(&routes::media_order(listing_id), &json!({}), &owner.token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["message"], "Missing required field: media_ids");
    }

    #[tokio::test]
    async fn non_integer_media_ids_are_rejected() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;

        let res = app
            .put_with_token(
                &routes::media_order(listing_id),
                &json!({"media_ids": ["first", "second"]}),
                &owner.token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn empty_list_is_accepted() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;

        let res = app
            .put_with_token(
                &routes::media_order(listing_id),
                &json!({"media_ids": []}),
                &owner.token,
            )
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["updated_count"], 0);
        assert_eq!(res.body["count_mismatch"], false);
    }

    #[tokio::test]
    async fn non_owner_is_forbidden() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let intruder = app.create_user("mallory").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;
        let items = app
            .upload_ok(listing_id, &[("a.jpg", JPG), ("b.jpg", JPG)], &owner.token)
            .await;

        let res = app
            .put_with_token(
                &routes::media_order(listing_id),
                &json!({"media_ids": [ids(&items)[1], ids(&items)[0]]}),
                &intruder.token,
            )
            .await;

        assert_eq!(res.status, 403);
        let first = app.get_without_token(&routes::media(ids(&items)[0])).await;
        assert_eq!(first.body["order"], 0);
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn delete_removes_row_and_file() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;
        let items = app
            .upload_ok(listing_id, &[("a.jpg", JPG), ("b.jpg", JPG)], &owner.token)
            .await;
        let media_id = ids(&items)[0];

        let res = app.delete_with_token(&routes::media(media_id), &owner.token).await;

        assert_eq!(res.status, 204);
        assert_eq!(app.get_without_token(&routes::media(media_id)).await.status, 404);
        assert_eq!(media_rows(&app, listing_id).await, 1);
        assert_eq!(app.files_on_disk(listing_id), 1);
    }

    #[tokio::test]
    async fn delete_succeeds_when_file_is_already_gone() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;
        let items = app
            .upload_ok(listing_id, &[("a.jpg", JPG)], &owner.token)
            .await;
        let media_id = ids(&items)[0];
        let filename = items[0]["filename"].as_str().unwrap();

        std::fs::remove_file(
            app.media_root
                .join(listing_id.to_string())
                .join("photo")
                .join(filename),
        )
        .unwrap();

        let res = app.delete_with_token(&routes::media(media_id), &owner.token).await;

        assert_eq!(res.status, 204);
        assert_eq!(media_rows(&app, listing_id).await, 0);
    }

    #[tokio::test]
    async fn delete_succeeds_when_file_cannot_be_removed() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;
        let items = app
            .upload_ok(listing_id, &[("a.jpg", JPG)], &owner.token)
            .await;
        let media_id = ids(&items)[0];
        let path = app
            .media_root
            .join(listing_id.to_string())
            .join("photo")
            .join(items[0]["filename"].as_str().unwrap());

        // Swap the file for a directory so unlinking it fails with an OS error.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let res = app.delete_with_token(&routes::media(media_id), &owner.token).await;

        assert_eq!(res.status, 204);
        assert_eq!(media_rows(&app, listing_id).await, 0);
        assert!(path.is_dir());
    }

    #[tokio::test]
    async fn non_owner_is_forbidden() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let intruder = app.create_user("mallory").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;
        let items = app
            .upload_ok(listing_id, &[("a.jpg", JPG)], &owner.token)
            .await;

        let res = app
            .delete_with_token(&routes::media(ids(&items)[0]), &intruder.token)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(media_rows(&app, listing_id).await, 1);
        assert_eq!(app.files_on_disk(listing_id), 1);
    }

    #[tokio::test]
    async fn missing_media_is_not_found() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;

        let res = app.delete_with_token(&routes::media(4242), &owner.token).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["message"], "Media not found");
    }
}

mod browse {
    use super::*;

    #[tokio::test]
    async fn media_list_is_public_and_ordered() {
        let app = TestApp::spawn().await;
        let owner = app.create_user("alice").await;
        let listing_id = app.create_listing(&owner.token, "Bike").await;
        app.upload_ok(listing_id, &[("a.jpg", JPG), ("b.mov", MOV)], &owner.token)
            .await;

        let res = app.get_without_token(routes::MEDIA).await;

        assert_eq!(res.status, 200);
        let items = res.body.as_array().unwrap();
        assert_eq!(orders(items), vec![0, 1]);
        assert_eq!(items[1]["media_type"], "video");
    }
}
