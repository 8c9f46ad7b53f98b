//! Every Cypher statement the service runs. `name` identifies the statement in
//! logs and in the in-process store; `columns` lists what each row carries.

#[derive(Debug)]
pub struct Statement {
    pub name: &'static str,
    pub cypher: &'static str,
    pub columns: &'static [&'static str],
}

const USER_AGGREGATE_COLUMNS: &[&str] = &["id", "props", "postCount", "followers", "following"];
const POST_COLUMNS: &[&str] = &["id", "props", "userId", "userName", "likes"];

pub static HEALTH: Statement = Statement {
    name: "health",
    cypher: "RETURN 1 AS ok",
    columns: &["ok"],
};

// ---- users ----

pub static USER_EMAIL_OWNERS: Statement = Statement {
    name: "user.email_owners",
    cypher: r#"
        MATCH (u:User {email: $email})
        RETURN id(u) AS id
    "#,
    columns: &["id"],
};

pub static USER_CREATE: Statement = Statement {
    name: "user.create",
    cypher: r#"
        CREATE (u:User {name: $name, email: $email, password: $password, image_pending: $imagePending})
        RETURN id(u) AS id
    "#,
    columns: &["id"],
};

pub static USER_SET_IMAGE: Statement = Statement {
    name: "user.set_image",
    cypher: r#"
        MATCH (u:User) WHERE id(u) = $id
        SET u.image = $image, u.image_pending = false
        RETURN id(u) AS id
    "#,
    columns: &["id"],
};

pub static USER_UPDATE: Statement = Statement {
    name: "user.update",
    cypher: r#"
        MATCH (u:User) WHERE id(u) = $id
        SET u.name = $name, u.email = $email
        RETURN id(u) AS id, properties(u) AS props
    "#,
    columns: &["id", "props"],
};

pub static USER_DELETE: Statement = Statement {
    name: "user.delete",
    cypher: r#"
        MATCH (u:User) WHERE id(u) = $id
        DELETE u
        RETURN count(*) AS deleted
    "#,
    columns: &["deleted"],
};

pub static USER_EXISTS: Statement = Statement {
    name: "user.exists",
    cypher: r#"
        OPTIONAL MATCH (u:User) WHERE id(u) = $id
        RETURN u IS NOT NULL AS exists
    "#,
    columns: &["exists"],
};

pub static USER_BY_ID: Statement = Statement {
    name: "user.by_id",
    cypher: r#"
        MATCH (u:User) WHERE id(u) = $id
        OPTIONAL MATCH (u)-[:POSTED]->(p:Post)
        OPTIONAL MATCH (follower:User)-[:FOLLOWS]->(u)
        OPTIONAL MATCH (u)-[:FOLLOWS]->(followed:User)
        RETURN id(u) AS id, properties(u) AS props,
               count(DISTINCT p) AS postCount,
               count(DISTINCT follower) AS followers,
               count(DISTINCT followed) AS following
    "#,
    columns: USER_AGGREGATE_COLUMNS,
};

pub static USER_BY_EMAIL: Statement = Statement {
    name: "user.by_email",
    cypher: r#"
        MATCH (u:User) WHERE u.email = $email
        OPTIONAL MATCH (u)-[:POSTED]->(p:Post)
        OPTIONAL MATCH (follower:User)-[:FOLLOWS]->(u)
        OPTIONAL MATCH (u)-[:FOLLOWS]->(followed:User)
        RETURN id(u) AS id, properties(u) AS props,
               count(DISTINCT p) AS postCount,
               count(DISTINCT follower) AS followers,
               count(DISTINCT followed) AS following
    "#,
    columns: USER_AGGREGATE_COLUMNS,
};

pub static USER_LIST: Statement = Statement {
    name: "user.list",
    cypher: r#"
        MATCH (u:User)
        OPTIONAL MATCH (u)-[:POSTED]->(p:Post)
        OPTIONAL MATCH (follower:User)-[:FOLLOWS]->(u)
        OPTIONAL MATCH (u)-[:FOLLOWS]->(followed:User)
        RETURN id(u) AS id, properties(u) AS props,
               count(DISTINCT p) AS postCount,
               count(DISTINCT follower) AS followers,
               count(DISTINCT followed) AS following
        ORDER BY id
    "#,
    columns: USER_AGGREGATE_COLUMNS,
};

pub static USER_PROFILE: Statement = Statement {
    name: "user.profile",
    cypher: r#"
        MATCH (u:User) WHERE id(u) = $profileId
        OPTIONAL MATCH (viewer:User)-[:FOLLOWS]->(u) WHERE id(viewer) = $viewerId
        OPTIONAL MATCH (u)-[:FOLLOWS]->(back:User) WHERE id(back) = $viewerId
        OPTIONAL MATCH (u)-[:POSTED]->(p:Post)
        OPTIONAL MATCH (follower:User)-[:FOLLOWS]->(u)
        OPTIONAL MATCH (u)-[:FOLLOWS]->(followed:User)
        RETURN id(u) AS id, properties(u) AS props,
               count(DISTINCT viewer) > 0 AS follows,
               count(DISTINCT back) > 0 AS isFollower,
               count(DISTINCT p) AS postCount,
               count(DISTINCT follower) AS followers,
               count(DISTINCT followed) AS following
    "#,
    columns: &[
        "id",
        "props",
        "follows",
        "isFollower",
        "postCount",
        "followers",
        "following",
    ],
};

pub static USER_FOLLOWERS: Statement = Statement {
    name: "user.followers",
    cypher: r#"
        MATCH (target:User) WHERE id(target) = $id
        OPTIONAL MATCH (follower:User)-[:FOLLOWS]->(target)
        RETURN follower AS user
        ORDER BY id(follower)
    "#,
    columns: &["user"],
};

pub static USER_FOLLOWING: Statement = Statement {
    name: "user.following",
    cypher: r#"
        MATCH (u:User) WHERE id(u) = $id
        OPTIONAL MATCH (u)-[:FOLLOWS]->(followed:User)
        RETURN followed AS user
        ORDER BY id(followed)
    "#,
    columns: &["user"],
};

// ---- edges ----

pub static ENDPOINTS_USER_USER: Statement = Statement {
    name: "edge.endpoints_user_user",
    cypher: r#"
        OPTIONAL MATCH (a:User) WHERE id(a) = $from
        OPTIONAL MATCH (b:User) WHERE id(b) = $to
        RETURN a IS NOT NULL AS fromExists, b IS NOT NULL AS toExists
    "#,
    columns: &["fromExists", "toExists"],
};

pub static ENDPOINTS_USER_POST: Statement = Statement {
    name: "edge.endpoints_user_post",
    cypher: r#"
        OPTIONAL MATCH (a:User) WHERE id(a) = $from
        OPTIONAL MATCH (b:Post) WHERE id(b) = $to
        RETURN a IS NOT NULL AS fromExists, b IS NOT NULL AS toExists
    "#,
    columns: &["fromExists", "toExists"],
};

pub static FOLLOW_MERGE: Statement = Statement {
    name: "edge.follow_merge",
    cypher: r#"
        MATCH (a:User), (b:User)
        WHERE id(a) = $from AND id(b) = $to
        MERGE (a)-[r:FOLLOWS]->(b)
        RETURN count(r) AS count
    "#,
    columns: &["count"],
};

pub static FOLLOW_DELETE: Statement = Statement {
    name: "edge.follow_delete",
    cypher: r#"
        MATCH (a:User)-[r:FOLLOWS]->(b:User)
        WHERE id(a) = $from AND id(b) = $to
        DELETE r
        RETURN count(r) AS count
    "#,
    columns: &["count"],
};

pub static LIKE_MERGE: Statement = Statement {
    name: "edge.like_merge",
    cypher: r#"
        MATCH (a:User), (b:Post)
        WHERE id(a) = $from AND id(b) = $to
        MERGE (a)-[r:LIKED]->(b)
        RETURN count(r) AS count
    "#,
    columns: &["count"],
};

pub static LIKE_DELETE: Statement = Statement {
    name: "edge.like_delete",
    cypher: r#"
        MATCH (a:User)-[r:LIKED]->(b:Post)
        WHERE id(a) = $from AND id(b) = $to
        DELETE r
        RETURN count(r) AS count
    "#,
    columns: &["count"],
};

// ---- posts ----

pub static POST_CREATE: Statement = Statement {
    name: "post.create",
    cypher: r#"
        MATCH (u:User) WHERE id(u) = $userId
        CREATE (p:Post {
            description: $description,
            created_at: $createdAt,
            images: [],
            expected_images: $expectedImages
        })
        CREATE (u)-[:POSTED]->(p)
        RETURN id(p) AS id
    "#,
    columns: &["id"],
};

pub static POST_SET_IMAGES: Statement = Statement {
    name: "post.set_images",
    cypher: r#"
        MATCH (p:Post) WHERE id(p) = $id
        SET p.images = $images
        RETURN id(p) AS id
    "#,
    columns: &["id"],
};

pub static POST_BY_ID: Statement = Statement {
    name: "post.by_id",
    cypher: r#"
        MATCH (u:User)-[:POSTED]->(p:Post) WHERE id(p) = $id
        OPTIONAL MATCH (liker:User)-[:LIKED]->(p)
        RETURN id(p) AS id, properties(p) AS props,
               id(u) AS userId, u.name AS userName,
               collect(DISTINCT id(liker)) AS likes
    "#,
    columns: POST_COLUMNS,
};

pub static POST_LIST: Statement = Statement {
    name: "post.list",
    cypher: r#"
        MATCH (u:User)-[:POSTED]->(p:Post)
        OPTIONAL MATCH (liker:User)-[:LIKED]->(p)
        RETURN id(p) AS id, properties(p) AS props,
               id(u) AS userId, u.name AS userName,
               collect(DISTINCT id(liker)) AS likes
        ORDER BY id DESC
    "#,
    columns: POST_COLUMNS,
};

pub static POST_LIST_BY_USER: Statement = Statement {
    name: "post.list_by_user",
    cypher: r#"
        MATCH (u:User)-[:POSTED]->(p:Post) WHERE id(u) = $userId
        OPTIONAL MATCH (liker:User)-[:LIKED]->(p)
        RETURN id(p) AS id, properties(p) AS props,
               id(u) AS userId, u.name AS userName,
               collect(DISTINCT id(liker)) AS likes
        ORDER BY id DESC
    "#,
    columns: POST_COLUMNS,
};

// DETACH DELETE drops POSTED and every LIKED together with the node.
pub static POST_DELETE: Statement = Statement {
    name: "post.delete",
    cypher: r#"
        MATCH (u:User)-[:POSTED]->(p:Post)
        WHERE id(u) = $userId AND id(p) = $postId
        WITH p, p.images AS images
        DETACH DELETE p
        RETURN images
    "#,
    columns: &["images"],
};
