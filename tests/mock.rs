extern crate rocket;
use rocket::async_test;

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;
    use rocket::http::{Header, Status};
    use rocket::local::asynchronous::{Client, LocalResponse};
    use serde_json::{json, Value};
    use service::feed::{
        FeedPlayer, FieldSnapshot, LiveRow, LiveSnapshot, Ranking, ScheduledEvent, Thru,
    };
    use service::testing::{test_league, TestLeague, TEST_ADMIN_KEY};

    const MASTERS: &str = "Masters Tournament";

    fn admin() -> Header<'static> {
        Header::new(api::ADMIN_KEY_HEADER, TEST_ADMIN_KEY)
    }

    async fn make_tracked_client(league: &TestLeague) -> Client {
        Client::tracked(api::build(league.ctx.clone()))
            .await
            .expect("valid rocket instance")
    }

    async fn body(res: LocalResponse<'_>) -> Value {
        res.into_json::<Value>().await.expect("json body")
    }

    async fn admin_post(client: &Client, uri: &str) -> (Status, Value) {
        let res = client.post(uri.to_string()).header(admin()).dispatch().await;
        let status = res.status();
        (status, body(res).await)
    }

    fn player(id: &str, name: &str) -> FeedPlayer {
        FeedPlayer {
            player_id: id.to_string(),
            player_name: name.to_string(),
            country: None,
        }
    }

    fn roster() -> Vec<FeedPlayer> {
        vec![
            player("1", "Scheffler, Scottie"),
            player("2", "McIlroy, Rory"),
            player("3", "Aberg, Ludvig"),
            player("4", "Schauffele, Xander"),
        ]
    }

    fn live(id: &str, position: &str, total: i32, thru: Thru, round: i32) -> LiveRow {
        LiveRow {
            player_id: id.to_string(),
            player_name: None,
            position: Some(position.to_string()),
            total: Some(total),
            thru: Some(thru),
            round: Some(round),
        }
    }

    fn seed_feed(league: &TestLeague) {
        league.feed.set_players(roster());
        league.feed.set_rankings(
            [("1", 3.0), ("2", 2.0), ("3", 1.0), ("4", 0.5)]
                .into_iter()
                .map(|(id, skill)| Ranking {
                    player_id: id.to_string(),
                    skill_estimate: Some(skill),
                })
                .collect(),
        );
        league.feed.set_schedule(vec![ScheduledEvent {
            event_id: "14".to_string(),
            event_name: MASTERS.to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 4, 10),
        }]);
        league.feed.set_field(FieldSnapshot {
            event_name: MASTERS.to_string(),
            current_round: None,
            field: roster(),
        });
        league.feed.set_live(LiveSnapshot {
            event_name: MASTERS.to_string(),
            current_round: Some(2),
            live_stats: vec![
                live("1", "1", -8, Thru::Holes(10), 2),
                live("2", "T2", -5, Thru::Holes(12), 2),
                live("3", "T2", -5, Thru::Finished, 2),
                live("4", "CUT", 3, Thru::Finished, 2),
            ],
        });
    }

    fn golfer_id(field: &Value, name: &str) -> i64 {
        field
            .as_array()
            .unwrap()
            .iter()
            .find(|row| row["name"] == name)
            .and_then(|row| row["golfer_id"].as_i64())
            .unwrap()
    }

    fn field_id(field: &Value, name: &str) -> i64 {
        field
            .as_array()
            .unwrap()
            .iter()
            .find(|row| row["name"] == name)
            .and_then(|row| row["field_id"].as_i64())
            .unwrap()
    }

    #[async_test]
    async fn admin_routes_need_the_key() {
        let league = test_league().await;
        let client = make_tracked_client(&league).await;

        let res = client.post("/api/admin/sync").dispatch().await;
        assert_eq!(res.status(), Status::Forbidden);
        let res = client
            .post("/api/admin/sync")
            .header(Header::new(api::ADMIN_KEY_HEADER, "wrong"))
            .dispatch()
            .await;
        assert_eq!(res.status(), Status::Forbidden);

        let res = client.get("/api/tournaments").dispatch().await;
        assert_eq!(res.status(), Status::Ok);
    }

    #[async_test]
    async fn league_week_end_to_end() {
        let league = test_league().await;
        seed_feed(&league);
        let client = make_tracked_client(&league).await;

        let (status, outcome) = admin_post(&client, "/api/admin/sync").await;
        assert_eq!(status, Status::Ok);
        assert_eq!(outcome["success"], true);

        let overview = body(client.get("/api/tournaments").dispatch().await).await;
        assert_eq!(overview["upcoming"][0]["name"], MASTERS);
        let id = overview["upcoming"][0]["id"].as_i64().unwrap();

        let (status, _) = admin_post(&client, &format!("/api/admin/tournament/{id}/activate")).await;
        assert_eq!(status, Status::Ok);
        let (status, outcome) =
            admin_post(&client, &format!("/api/admin/tournament/{id}/field/auto")).await;
        assert_eq!(status, Status::Ok);
        assert_eq!(outcome["message"], "Assigned 4 golfers to tiers");

        let field = body(
            client
                .get(format!("/api/tournament/{id}/field"))
                .dispatch()
                .await,
        )
        .await;
        for name in ["McIlroy, Rory", "Schauffele, Xander"] {
            let (status, _) = admin_post(
                &client,
                &format!("/api/admin/field/{}/tier/2", field_id(&field, name)),
            )
            .await;
            assert_eq!(status, Status::Ok);
        }

        let res = client
            .put(format!("/api/admin/tournament/{id}/pricing"))
            .header(admin())
            .json(&json!({ "entry_price": 20 }))
            .dispatch()
            .await;
        assert_eq!(res.status(), Status::Ok);

        for (username, display) in [("sam", "Sam"), ("alex", "Alex")] {
            let res = client
                .post("/api/admin/users")
                .header(admin())
                .json(&json!({ "username": username, "display_name": display }))
                .dispatch()
                .await;
            assert_eq!(res.status(), Status::Ok);
        }

        let picks = [
            (1, golfer_id(&field, "Scheffler, Scottie"), golfer_id(&field, "McIlroy, Rory")),
            (2, golfer_id(&field, "Aberg, Ludvig"), golfer_id(&field, "Schauffele, Xander")),
        ];
        for (user_id, tier1, tier2) in picks {
            let res = client
                .put(format!("/api/admin/tournament/{id}/entry/{user_id}/1"))
                .header(admin())
                .json(&json!({ "tier1": tier1, "tier2": tier2 }))
                .dispatch()
                .await;
            assert_eq!(res.status(), Status::Ok);
        }
        let wrong_tier = client
            .put(format!("/api/admin/tournament/{id}/entry/1/2"))
            .header(admin())
            .json(&json!({ "tier2": golfer_id(&field, "Scheffler, Scottie") }))
            .dispatch()
            .await;
        assert_eq!(wrong_tier.status(), Status::BadRequest);

        let res = client
            .post(format!("/api/tournament/{id}/refresh"))
            .dispatch()
            .await;
        assert_eq!(res.status(), Status::Ok);
        assert_eq!(body(res).await["message"], "Scores updated (4 golfers)");
        let res = client
            .post(format!("/api/tournament/{id}/refresh"))
            .dispatch()
            .await;
        assert_eq!(res.status(), Status::TooManyRequests);

        let view = body(
            client
                .get(format!("/api/tournament/{id}/standings"))
                .dispatch()
                .await,
        )
        .await;
        assert_eq!(view["purse"], 40);
        assert_eq!(view["notice"], Value::Null);
        assert_eq!(view["standings"][0]["display_name"], "Sam");
        assert_eq!(view["standings"][0]["rank"], 1);
        assert_eq!(view["standings"][0]["best_two_total"], -13);
        assert_eq!(view["standings"][1]["best_two_total"], Value::Null);

        let board = body(
            client
                .get(format!("/api/tournament/{id}/leaderboard"))
                .dispatch()
                .await,
        )
        .await;
        assert_eq!(board[0]["position"], "1");
        assert_eq!(board[1]["position"], "T2");
        assert_eq!(board[3]["score"], "MC");

        let (_, outcome) =
            admin_post(&client, &format!("/api/admin/tournament/{id}/toggle-lock")).await;
        assert_eq!(outcome["message"], "Picks locked");
        let locked = client
            .put(format!("/api/admin/tournament/{id}/entry/1/2"))
            .header(admin())
            .json(&json!({}))
            .dispatch()
            .await;
        assert_eq!(locked.status(), Status::Forbidden);
        let res = client
            .delete(format!("/api/admin/tournament/{id}/entry/2/1"))
            .header(admin())
            .dispatch()
            .await;
        assert_eq!(res.status(), Status::Ok);

        let (status, _) = admin_post(&client, &format!("/api/admin/tournament/{id}/complete")).await;
        assert_eq!(status, Status::Ok);
        let overview = body(client.get("/api/tournaments").dispatch().await).await;
        assert_eq!(overview["completed"][0]["id"], id);

        let season = body(client.get("/api/season").dispatch().await).await;
        assert_eq!(season["year"], 2025);
        assert_eq!(season["available_years"], json!([2025]));
        assert_eq!(season["tournament_count"], 1);
        assert_eq!(season["standings"][0]["display_name"], "Sam");
        assert_eq!(season["standings"][0]["wins"], 1);
        assert_eq!(season["standings"][0]["winnings"], 20);
        let earlier = body(client.get("/api/season/2024").dispatch().await).await;
        assert_eq!(earlier["standings"], json!([]));

        let messages = league.notifier.messages();
        assert!(messages.iter().any(|m| m.contains("Sam Created Entry 1")));
        let last = messages.last().unwrap();
        assert!(last.starts_with("🏌️ Masters Tournament - Top 10"));
        assert!(last.contains("1. Sam - -13"));
    }
}
