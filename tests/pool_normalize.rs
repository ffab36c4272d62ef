// tests/pool_normalize.rs
//
// Pool construction from realistic CMS responses: envelope shapes, field
// normalization, malformed-record dropping, duplicate ids.

use serde_json::{json, Value};

use related_news::pool::{parse_article, records_in};
use related_news::ArticlePool;

fn fixture() -> Value {
    let raw = include_str!("fixtures/posts.json");
    serde_json::from_str(raw).expect("fixture is valid json")
}

#[test]
fn edges_envelope_keeps_valid_records_and_reports_dropped() {
    let (pool, dropped) = ArticlePool::from_response_with_report(&fixture());
    assert_eq!(pool.len(), 5);
    assert_eq!(dropped, 1, "the record without an id is dropped");
    assert!(pool.find_by_slug("broken-record-without-id").is_none());
}

#[test]
fn nested_relay_fields_are_flattened() {
    let pool = ArticlePool::from_response(&fixture());
    let a = pool.find_by_slug("senate-race-tightens").expect("present");

    assert_eq!(a.id, "101");
    assert_eq!(a.excerpt.as_deref(), Some("Polls show a dead heat & turnout is up."));
    assert_eq!(a.author_id(), Some("u1"));
    assert_eq!(a.primary_category().map(|c| c.slug.as_str()), Some("politics"));
    assert_eq!(a.tags.len(), 1);
    let img = a.featured_image.as_ref().expect("image");
    assert_eq!(img.url, "https://cdn.example.org/senate.jpg");
    assert_eq!(img.alt_text.as_deref(), Some("Voters queue"));
    assert!(a.modified_date > a.publish_date);

    let b = pool.find_by_slug("budget-vote-delayed").expect("present");
    let cats: Vec<_> = b.categories.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(cats, vec!["3", "9"], "category order is preserved");
    assert_eq!(b.categories[1].database_id, Some(9));
    assert!(b.featured_image.is_none());

    let g = pool.find_by_slug("gallery-reopens").expect("present");
    assert!(g.excerpt.is_none(), "empty excerpts are absent");
}

#[test]
fn nodes_single_and_bare_array_envelopes() {
    let rec = json!({"id": "1", "slug": "a", "date": "2024-03-01T10:00:00Z"});

    let nodes = json!({"data": {"posts": {"nodes": [rec.clone()]}}});
    assert_eq!(records_in(&nodes).len(), 1);

    let single = json!({"data": {"post": rec.clone()}});
    assert_eq!(ArticlePool::from_response(&single).len(), 1);

    let missing = json!({"data": {"post": null}});
    assert!(ArticlePool::from_response(&missing).is_empty());

    let bare = json!([rec.clone(), rec]);
    assert_eq!(ArticlePool::from_response(&bare).len(), 1, "duplicate ids collapse");
}

#[test]
fn flat_record_shapes_are_accepted() {
    let a = parse_article(&json!({
        "id": 7,
        "slug": "flat",
        "title": "Rates &amp; <b>markets</b>",
        "date": "2024-03-01 10:00:00",
        "author": {"id": "u9", "name": "Kim"},
        "featuredImage": {"url": "https://cdn.example.org/a.jpg"},
        "categories": [{"id": 3, "name": "Politics", "slug": "politics"}]
    }))
    .expect("valid");
    assert_eq!(a.id, "7");
    assert_eq!(a.title, "Rates & markets");
    assert_eq!(a.author_id(), Some("u9"));
    assert_eq!(a.categories[0].id, "3");
    assert_eq!(
        a.featured_image.map(|i| i.url).as_deref(),
        Some("https://cdn.example.org/a.jpg")
    );
}

#[test]
fn malformed_records_are_rejected_not_fatal() {
    let resp = json!([
        "not an object",
        {"id": "1", "date": "2024-03-01T00:00:00"},
        {"id": "2", "slug": "no-date"},
        {"id": "3", "slug": "bad-date", "date": "last tuesday"},
        {"id": "4", "slug": 4, "date": "2024-03-01T00:00:00"},
        {"id": "5", "slug": "ok", "date": "2024-03-01T00:00:00"}
    ]);
    let (pool, dropped) = ArticlePool::from_response_with_report(&resp);
    assert_eq!(dropped, 5);
    assert_eq!(pool.len(), 1);
    assert_eq!(pool.articles()[0].slug, "ok");
}

#[test]
fn bad_optional_fields_only_lose_that_signal() {
    let resp = json!([
        {"id": "1", "slug": "a", "date": "2024-03-01T00:00:00", "tags": {"nodes": null}},
        {"id": "2", "slug": "b", "date": "2024-03-01T00:00:00", "author": "jane"},
        {"id": "3", "slug": "c", "date": "2024-03-01T00:00:00", "excerpt": 42},
        {"id": "4", "slug": "d", "date": "2024-03-01T00:00:00", "categories": 5,
         "featuredImage": {"node": {"sourceUrl": false}}}
    ]);
    let (pool, dropped) = ArticlePool::from_response_with_report(&resp);
    assert_eq!(dropped, 0);
    assert_eq!(pool.len(), 4);

    let get = |slug| pool.find_by_slug(slug).expect("kept");
    assert!(get("a").tags.is_empty());
    assert!(get("b").author.is_none());
    assert!(get("c").excerpt.is_none());
    assert!(get("d").categories.is_empty());
    assert!(get("d").featured_image.is_none());
}

#[test]
fn merge_keeps_first_copy_of_each_id() {
    let first = ArticlePool::from_response(&json!([
        {"id": "1", "slug": "one", "title": "First", "date": "2024-03-01T00:00:00"}
    ]));
    let second = ArticlePool::from_response(&json!([
        {"id": "1", "slug": "one", "title": "Second", "date": "2024-03-01T00:00:00"},
        {"id": "2", "slug": "two", "date": "2024-03-02T00:00:00"}
    ]));
    let merged = first.merge(second);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged.find_by_slug("one").map(|a| a.title.as_str()), Some("First"));
}
