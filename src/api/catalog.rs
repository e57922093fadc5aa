//! Built-in route catalog, used when the configuration lists no routes.
//!
//! Covers profiles, things, stars, follows, tags, comments, files, licenses
//! and events. Specific patterns come before the general ones they overlap.

use crate::config::schema::{AuthConfig, RouteConfig, ShapeConfig};

const PROFILE: &str = r"(?P<profile>[\w.-]+)";
const THING: &str = r"(?P<thing>[\w.-]+)";
const FILE: &str = r"(?P<file>[^/]+)";

struct Entry(RouteConfig);

impl Entry {
    fn new(name: &str, methods: &str, pattern: String, procedure: &str) -> Self {
        Entry(RouteConfig {
            name: name.to_string(),
            methods: methods.to_string(),
            pattern,
            procedure: procedure.to_string(),
            params: Vec::new(),
            shape: ShapeConfig::Ok,
            fields: None,
            auth: AuthConfig::None,
            owner_param: None,
            owner_flag: None,
            user_param: None,
        })
    }

    fn params(mut self, params: &[&str]) -> Self {
        self.0.params = params.iter().map(|p| p.to_string()).collect();
        self
    }

    fn shape(mut self, shape: ShapeConfig) -> Self {
        self.0.shape = shape;
        self
    }

    fn fields(mut self, fields: &str) -> Self {
        self.0.shape = ShapeConfig::Fields;
        self.0.fields = Some(fields.to_string());
        self
    }

    fn user(mut self) -> Self {
        self.0.auth = AuthConfig::User;
        self
    }

    fn owner(mut self, param: &str) -> Self {
        self.0.auth = AuthConfig::Owner;
        self.0.owner_param = Some(param.to_string());
        self
    }

    fn owner_flag(mut self, flag: &str, param: &str) -> Self {
        self.0.owner_flag = Some(flag.to_string());
        self.0.owner_param = Some(param.to_string());
        self
    }

    fn user_param(mut self, param: &str) -> Self {
        self.0.user_param = Some(param.to_string());
        self
    }
}

pub fn builtin_routes() -> Vec<RouteConfig> {
    let profile = format!("/api/profiles/{PROFILE}");
    let thing = format!("{profile}/things/{THING}");

    vec![
        // Profiles
        Entry::new("get-profiles", "GET", "/api/profiles".into(), "FindProfiles")
            .params(&["query", "order", "limit:u", "offset:u"])
            .shape(ShapeConfig::List),
        Entry::new("profile-available", "GET", format!("{profile}/available"), "Available")
            .params(&["profile"])
            .shape(ShapeConfig::Bool),
        Entry::new("get-avatar", "GET", format!("{profile}/avatar"), "GetProfileAvatar")
            .params(&["profile"])
            .shape(ShapeConfig::Redirect),
        Entry::new("follow", "PUT", format!("{profile}/follow"), "Follow")
            .params(&["user", "profile"])
            .user()
            .user_param("user"),
        Entry::new("unfollow", "DELETE", format!("{profile}/follow"), "Unfollow")
            .params(&["user", "profile"])
            .user()
            .user_param("user"),
        Entry::new("get-profile", "GET", profile.clone(), "GetProfile")
            .params(&["profile", "unpublished:b"])
            .fields("*profile things followers following starred badges events")
            .owner_flag("unpublished", "profile"),
        Entry::new("put-profile", "PUT", profile.clone(), "PutProfile")
            .params(&["profile", "fullname", "location", "url", "bio"])
            .owner("profile"),
        // Things
        Entry::new("get-things", "GET", "/api/things".into(), "FindThings")
            .params(&["query", "license", "order", "limit:u", "offset:u"])
            .shape(ShapeConfig::List),
        Entry::new("thing-available", "GET", format!("{thing}/available"), "ThingAvailable")
            .params(&["profile", "thing"])
            .shape(ShapeConfig::Bool),
        Entry::new("publish-thing", "PUT", format!("{thing}/publish"), "PublishThing")
            .params(&["profile", "thing"])
            .owner("profile"),
        Entry::new("rename-thing", "PUT", format!("{thing}/rename"), "RenameThing")
            .params(&["profile", "thing", "name"])
            .owner("profile"),
        Entry::new("star-thing", "PUT", format!("{thing}/star"), "StarThing")
            .params(&["user", "profile", "thing"])
            .user()
            .user_param("user"),
        Entry::new("unstar-thing", "DELETE", format!("{thing}/star"), "UnstarThing")
            .params(&["user", "profile", "thing"])
            .user()
            .user_param("user"),
        Entry::new("tag-thing", "PUT", format!("{thing}/tags"), "MultiTagThing")
            .params(&["profile", "thing", "tags"])
            .user(),
        Entry::new("untag-thing", "DELETE", format!("{thing}/tags"), "MultiUntagThing")
            .params(&["profile", "thing", "tags"])
            .owner("profile"),
        // Comments
        Entry::new("post-comment", "POST", format!("{thing}/comments"), "PostComment")
            .params(&["owner", "profile", "thing", "ref:u", "text"])
            .shape(ShapeConfig::U64)
            .user()
            .user_param("owner"),
        Entry::new(
            "update-comment",
            "PUT",
            format!(r"{thing}/comments/(?P<comment>\d+)"),
            "UpdateComment",
        )
        .params(&["owner", "comment:u", "text"])
        .user()
        .user_param("owner"),
        Entry::new(
            "delete-comment",
            "DELETE",
            format!(r"{thing}/comments/(?P<comment>\d+)"),
            "DeleteComment",
        )
        .params(&["owner", "comment:u"])
        .user()
        .user_param("owner"),
        // Files
        Entry::new("download-file", "GET", format!("{thing}/files/{FILE}"), "DownloadFile")
            .params(&["profile", "thing", "file", "count:b"])
            .shape(ShapeConfig::Redirect),
        Entry::new("delete-file", "DELETE", format!("{thing}/files/{FILE}"), "DeleteFile")
            .params(&["profile", "thing", "file"])
            .owner("profile"),
        Entry::new("get-thing", "GET", thing.clone(), "GetThing")
            .params(&["profile", "thing", "user", "unpublished:b"])
            .fields("*thing files comments stars")
            .owner_flag("unpublished", "profile")
            .user_param("user"),
        Entry::new("put-thing", "PUT", thing.clone(), "PutThing")
            .params(&[
                "profile", "thing", "type", "title", "url", "instructions", "license", "publish:b",
            ])
            .owner("profile"),
        Entry::new("delete-thing", "DELETE", thing, "DeleteThing")
            .params(&["profile", "thing"])
            .owner("profile"),
        // Tags, licenses, events
        Entry::new("get-tags", "GET", "/api/tags".into(), "GetTags")
            .params(&["limit:u"])
            .shape(ShapeConfig::List),
        Entry::new("get-tag-things", "GET", r"/api/tags/(?P<tag>[^/]+)".into(), "FindThingsByTag")
            .params(&["tag", "order", "limit:u", "offset:u"])
            .shape(ShapeConfig::List),
        Entry::new("get-licenses", "GET", "/api/licenses".into(), "GetLicenses")
            .shape(ShapeConfig::List),
        Entry::new("get-events", "GET", "/api/events".into(), "GetEvents")
            .params(&["subject", "action", "object_type", "object", "owner", "since", "limit:u"])
            .shape(ShapeConfig::List),
    ]
    .into_iter()
    .map(|entry| entry.0)
    .collect()
}
