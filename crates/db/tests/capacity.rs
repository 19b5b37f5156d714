//! Capacity arbiter tests: VALID reservations consume capacity, PENDING and
//! cancelled ones never do, sibling fallback walks ascending ids.

mod common;

use common::*;
use courtside_db::repositories::SlotRepo;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn fresh_slot_has_capacity(pool: PgPool) {
    let slot = create_slot(&pool, 1, 1000.0, 1).await;

    let mut conn = pool.acquire().await.unwrap();
    assert!(SlotRepo::has_available_capacity(&mut conn, slot, match_date())
        .await
        .unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn valid_reservation_consumes_capacity(pool: PgPool) {
    let user = create_user(&pool, "cap1@test.local", 0.0).await;
    let slot = create_slot(&pool, 1, 1000.0, 1).await;
    create_reservation_row(&pool, slot, match_date(), user, 1, 1, "VALIDCAP1").await;

    let mut conn = pool.acquire().await.unwrap();
    assert!(!SlotRepo::has_available_capacity(&mut conn, slot, match_date())
        .await
        .unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn pending_reservations_never_consume_capacity(pool: PgPool) {
    let user = create_user(&pool, "cap2@test.local", 0.0).await;
    let slot = create_slot(&pool, 1, 1000.0, 1).await;
    // Arbitrarily many pending bids may coexist on a full-capacity group.
    create_reservation_row(&pool, slot, match_date(), user, 2, 0, "PENDCAP1").await;
    create_reservation_row(&pool, slot, match_date(), user, 2, 0, "PENDCAP2").await;
    create_reservation_row(&pool, slot, match_date(), user, 2, 0, "PENDCAP3").await;

    let mut conn = pool.acquire().await.unwrap();
    assert!(SlotRepo::has_available_capacity(&mut conn, slot, match_date())
        .await
        .unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancelled_reservations_release_capacity(pool: PgPool) {
    let user = create_user(&pool, "cap3@test.local", 0.0).await;
    let slot = create_slot(&pool, 1, 1000.0, 1).await;
    let reservation = create_reservation_row(&pool, slot, match_date(), user, 1, 1, "CANCAP01").await;

    let mut conn = pool.acquire().await.unwrap();
    assert!(!SlotRepo::has_available_capacity(&mut conn, slot, match_date())
        .await
        .unwrap());
    drop(conn);

    cancel_reservation_row(&pool, reservation).await;

    let mut conn = pool.acquire().await.unwrap();
    assert!(SlotRepo::has_available_capacity(&mut conn, slot, match_date())
        .await
        .unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn capacity_above_one_admits_multiple_valid_matches(pool: PgPool) {
    let user = create_user(&pool, "cap4@test.local", 0.0).await;
    let slot = create_slot(&pool, 1, 1000.0, 2).await;
    create_reservation_row(&pool, slot, match_date(), user, 1, 1, "TWOCAP01").await;

    let mut conn = pool.acquire().await.unwrap();
    assert!(SlotRepo::has_available_capacity(&mut conn, slot, match_date())
        .await
        .unwrap());
    drop(conn);

    create_reservation_row(&pool, slot, match_date(), user, 1, 1, "TWOCAP02").await;

    let mut conn = pool.acquire().await.unwrap();
    assert!(!SlotRepo::has_available_capacity(&mut conn, slot, match_date())
        .await
        .unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn other_dates_do_not_consume_capacity(pool: PgPool) {
    let user = create_user(&pool, "cap5@test.local", 0.0).await;
    let slot = create_slot(&pool, 1, 1000.0, 1).await;
    create_reservation_row(&pool, slot, match_date(), user, 1, 1, "DATECAP1").await;

    let other_date = match_date().succ_opt().unwrap();
    let mut conn = pool.acquire().await.unwrap();
    assert!(SlotRepo::has_available_capacity(&mut conn, slot, other_date)
        .await
        .unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn find_free_sibling_walks_ascending_ids(pool: PgPool) {
    let user = create_user(&pool, "sib1@test.local", 0.0).await;
    let start = slot_start();
    let end = start + chrono::Duration::minutes(90);

    let requested = create_slot_at(&pool, 1, start, end, 1000.0, 1).await;
    let sibling_a = create_slot_at(&pool, 1, start, end, 1000.0, 1).await;
    let sibling_b = create_slot_at(&pool, 1, start, end, 1000.0, 1).await;
    assert!(sibling_a < sibling_b);

    // Fill the requested slot.
    create_reservation_row(&pool, requested, match_date(), user, 1, 1, "SIBFULL1").await;

    let slot = SlotRepo::find_by_id(&pool, requested).await.unwrap().unwrap();
    let mut conn = pool.acquire().await.unwrap();
    let free = SlotRepo::find_free_sibling(&mut conn, &slot, match_date())
        .await
        .unwrap()
        .expect("a sibling should be free");
    assert_eq!(free.id, sibling_a);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn find_free_sibling_skips_full_siblings(pool: PgPool) {
    let user = create_user(&pool, "sib2@test.local", 0.0).await;
    let start = slot_start();
    let end = start + chrono::Duration::minutes(90);

    let requested = create_slot_at(&pool, 1, start, end, 1000.0, 1).await;
    let sibling_a = create_slot_at(&pool, 1, start, end, 1000.0, 1).await;
    let sibling_b = create_slot_at(&pool, 1, start, end, 1000.0, 1).await;

    create_reservation_row(&pool, requested, match_date(), user, 1, 1, "SIBSKIP1").await;
    create_reservation_row(&pool, sibling_a, match_date(), user, 1, 1, "SIBSKIP2").await;

    let slot = SlotRepo::find_by_id(&pool, requested).await.unwrap().unwrap();
    let mut conn = pool.acquire().await.unwrap();
    let free = SlotRepo::find_free_sibling(&mut conn, &slot, match_date())
        .await
        .unwrap()
        .expect("the last sibling should be free");
    assert_eq!(free.id, sibling_b);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn find_free_sibling_none_when_group_is_full(pool: PgPool) {
    let user = create_user(&pool, "sib3@test.local", 0.0).await;
    let start = slot_start();
    let end = start + chrono::Duration::minutes(90);

    let requested = create_slot_at(&pool, 1, start, end, 1000.0, 1).await;
    let sibling = create_slot_at(&pool, 1, start, end, 1000.0, 1).await;

    create_reservation_row(&pool, requested, match_date(), user, 1, 1, "SIBNONE1").await;
    create_reservation_row(&pool, sibling, match_date(), user, 1, 1, "SIBNONE2").await;

    let slot = SlotRepo::find_by_id(&pool, requested).await.unwrap().unwrap();
    let mut conn = pool.acquire().await.unwrap();
    assert!(SlotRepo::find_free_sibling(&mut conn, &slot, match_date())
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn slots_on_other_times_are_not_siblings(pool: PgPool) {
    let user = create_user(&pool, "sib4@test.local", 0.0).await;
    let start = slot_start();
    let end = start + chrono::Duration::minutes(90);

    let requested = create_slot_at(&pool, 1, start, end, 1000.0, 1).await;
    // Same court, later time: not a sibling.
    create_slot_at(&pool, 1, end, end + chrono::Duration::minutes(90), 1000.0, 1).await;
    // Different court, same time: not a sibling.
    create_slot_at(&pool, 2, start, end, 1000.0, 1).await;

    create_reservation_row(&pool, requested, match_date(), user, 1, 1, "SIBTIME1").await;

    let slot = SlotRepo::find_by_id(&pool, requested).await.unwrap().unwrap();
    let mut conn = pool.acquire().await.unwrap();
    assert!(SlotRepo::find_free_sibling(&mut conn, &slot, match_date())
        .await
        .unwrap()
        .is_none());
}
