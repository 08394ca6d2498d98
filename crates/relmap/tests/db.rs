use relmap::serial::{heads, optional, required};
use relmap::{
    Conditions, Db, DeleteQuery, ExecResult, Executor, Expr, Mapped, OrmError, OrmResult,
    SelectQuery, Value, VecCursor,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Default, PartialEq, Mapped)]
#[orm(table = "users")]
struct User {
    #[orm("column:id;primary;auto_increment")]
    id: i64,
    #[orm("column:name")]
    name: String,
}

#[derive(Debug, Default, PartialEq, Mapped)]
#[orm(table = "posts")]
struct Post {
    #[orm("column:post_id;primary")]
    post_id: i64,
    #[orm("column:title")]
    title: String,
}

/// Records every statement and replays canned cursors.
#[derive(Default)]
struct Recorder {
    statements: Mutex<Vec<(String, Vec<Value>)>>,
    cursors: Mutex<VecDeque<VecCursor>>,
    last_insert_id: Option<i64>,
    delay: Option<Duration>,
}

impl Recorder {
    fn with_cursor(cursor: VecCursor) -> Self {
        let recorder = Self::default();
        recorder.cursors.lock().unwrap().push_back(cursor);
        recorder
    }

    fn record(&self, sql: &str, args: &[Value]) {
        self.statements
            .lock()
            .unwrap()
            .push((sql.to_string(), args.to_vec()));
    }

    fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.statements.lock().unwrap().clone()
    }
}

impl Executor for Recorder {
    type Cursor = VecCursor;

    async fn query(&self, sql: &str, args: &[Value]) -> OrmResult<VecCursor> {
        self.record(sql, args);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.cursors.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> OrmResult<ExecResult> {
        self.record(sql, args);
        Ok(ExecResult {
            rows_affected: 1,
            last_insert_id: self.last_insert_id,
        })
    }
}

#[tokio::test]
async fn find_renders_schema_columns() {
    let cursor = VecCursor::new(
        ["id", "name"],
        vec![
            vec![Value::Int(1), Value::from("go")],
            vec![Value::Int(2), Value::from("rust")],
        ],
    );
    let db = Db::new(Recorder::with_cursor(cursor));

    let users: Vec<User> = db
        .find(Conditions::new().value("name", "go"))
        .await
        .unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[1].name, "rust");

    let statements = db.executor().statements();
    assert_eq!(
        statements[0].0,
        "SELECT `id`, `name` FROM `users` WHERE (`name` = ?)"
    );
    assert_eq!(statements[0].1, vec![Value::from("go")]);
}

#[tokio::test]
async fn fetch_one_and_optional() {
    let cursor = VecCursor::new(["post_id", "title"], vec![vec![Value::Int(3), Value::from("hi")]]);
    let db = Db::new(Recorder::with_cursor(cursor));
    let query = SelectQuery::new("posts")
        .filter(Expr::eq("post_id", 3))
        .build(db.registry().dialect())
        .unwrap();

    let post: Post = db.fetch_one(&query).await.unwrap();
    assert_eq!(
        post,
        Post {
            post_id: 3,
            title: "hi".into()
        }
    );

    // The recorder has no more canned results: an empty cursor.
    assert_eq!(db.fetch_optional::<Post>(&query).await.unwrap(), None);
    assert!(db.fetch_one::<Post>(&query).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn insert_writes_generated_key_back() {
    let recorder = Recorder {
        last_insert_id: Some(41),
        ..Recorder::default()
    };
    let db = Db::new(recorder);
    let mut user = User {
        id: 0,
        name: "go".into(),
    };
    let result = db.insert(&mut user).await.unwrap();
    assert_eq!(result.rows_affected, 1);
    assert_eq!(user.id, 41);

    let statements = db.executor().statements();
    assert_eq!(statements[0].0, "INSERT INTO `users` (`name`) VALUES (?)");
}

#[tokio::test]
async fn update_and_delete() {
    let db = Db::new(Recorder::default());
    let user = User {
        id: 5,
        name: "renamed".into(),
    };
    assert_eq!(db.update_by_key(&user).await.unwrap(), 1);
    assert_eq!(
        db.update("users", [("name", "x")], &Expr::gt("id", 10))
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        db.delete(&DeleteQuery::new("users").filter(Expr::eq("id", 5)))
            .await
            .unwrap(),
        1
    );

    let sql: Vec<String> = db.executor().statements().into_iter().map(|s| s.0).collect();
    assert_eq!(
        sql,
        [
            "UPDATE `users` SET `name` = ? WHERE (`id` = ?)",
            "UPDATE `users` SET `name` = ? WHERE `id` > ?",
            "DELETE FROM `users` WHERE `id` = ?",
        ]
    );
}

#[tokio::test]
async fn dangerous_statements_never_reach_the_executor() {
    let db = Db::new(Recorder::default());

    let err = db.delete(&DeleteQuery::new("users")).await.unwrap_err();
    assert!(err.is_dangerous());

    let err = db
        .update("users", [("name", "x")], &Expr::raw("   "))
        .await
        .unwrap_err();
    assert!(err.is_dangerous());

    let err = db
        .execute(&relmap::BuiltQuery::new(" ", vec![]))
        .await
        .unwrap_err();
    assert!(err.is_dangerous());

    assert!(db.executor().statements().is_empty());
}

#[tokio::test]
async fn fetch_serial_splits_join() {
    let cursor = VecCursor::new(
        ["id", "name", "post_id", "title"],
        vec![vec![Value::Int(1), Value::from("go"), Value::Null, Value::Null]],
    );
    let db = Db::new(Recorder::with_cursor(cursor));
    let query = SelectQuery::new("users")
        .columns(["users.id", "users.name", "posts.post_id", "posts.title"])
        .left_join("posts", "posts.user_id = users.id")
        .build(db.registry().dialect())
        .unwrap();

    let mut user = User::default();
    let mut post: Option<Post> = None;
    db.fetch_serial(
        &query,
        &heads(&["id", "post_id"]),
        &mut [&mut required(&mut user), &mut optional(&mut post)],
    )
    .await
    .unwrap();
    assert_eq!(user.name, "go");
    assert_eq!(post, None);
}

#[tokio::test]
async fn slow_statements_time_out() {
    let recorder = Recorder {
        delay: Some(Duration::from_millis(200)),
        ..Recorder::default()
    };
    let db = Db::new(recorder).query_timeout(Duration::from_millis(10));
    let query = SelectQuery::new("users").build(db.registry().dialect()).unwrap();
    let err = db.query(&query).await.unwrap_err();
    assert!(err.is_timeout());
    assert!(matches!(err, OrmError::Timeout(d) if d == Duration::from_millis(10)));
}
