//! Request Router
//!
//! Maps request paths onto board operations and renders the result.
//!
//! ## Routes
//! ```text
//! /                                   home page
//! /register/[<user>/[<email>/]]?...   three-step registration
//! /login/[<user>/]?...                two-step login (certificate required)
//! /logout/                            unbind the presented certificate
//! /verify/<code>/                     redeem a verification code
//! /f/<subforum>/                      thread list of a subforum
//! /thread/<id>/                       a thread and its posts
//! /new/thread/<subforum>/[<title>/]   two-step thread creation
//! /new/post/<thread>/                 reply
//! /report/<post>/                     report a post
//! /search/?<keywords or @user>        keyword or author search
//! /console/?<command>                 moderator console
//! ```
//!
//! Multi-step flows carry earlier answers in the path and redirect to the
//! next step; nothing is kept between requests.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::board::{validate_title, validate_username, Board, Identity};
use crate::error::{AuthError, LarigotError, Result};
use crate::model::{display_username, Post};
use super::escape::{escape_path, unescape_path, unescape_query};
use super::{Request, Response};

/// Routes requests to a shared board
#[derive(Debug, Clone)]
pub struct Router {
    board: Arc<Board>,
}

impl Router {
    pub fn new(board: Arc<Board>) -> Self {
        Self { board }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Handle one request; every error becomes a response
    pub fn handle(&self, request: &Request) -> Response {
        let segments = request.segments();
        tracing::trace!("Routing {} ({} segments)", request.path, segments.len());

        let (head, rest) = match segments.split_first() {
            Some((head, rest)) => (*head, rest),
            None => ("", &[][..]),
        };

        let result = match head {
            "" => self.home(request),
            "register" => self.register(request, rest),
            "login" => self.login(request, rest),
            "logout" => self.logout(request),
            "verify" => self.verify(rest),
            "f" => self.subforum(rest),
            "thread" => self.thread(rest),
            "new" => match rest.split_first() {
                Some((&"thread", rest)) => self.new_thread(request, rest),
                Some((&"post", rest)) => self.new_post(request, rest),
                _ => Err(LarigotError::NotFound("page")),
            },
            "report" => self.report(request, rest),
            "search" => self.search(request),
            "console" => self.console(request),
            _ => Err(LarigotError::NotFound("page")),
        };

        result.unwrap_or_else(Response::from)
    }

    // =========================================================================
    // Caller checks
    // =========================================================================

    fn certificate<'r>(&self, request: &'r Request) -> Result<&'r str> {
        request
            .fingerprint
            .as_deref()
            .ok_or_else(|| AuthError::CertificateRequired.into())
    }

    /// A logged-in, unmuted caller
    fn writer(&self, request: &Request) -> Result<Identity> {
        let caller = self.board.resolve(Some(self.certificate(request)?));
        self.board.authorize_writer(&caller)?;
        Ok(caller)
    }

    /// The one-time posting notice, if this caller has not seen it yet
    fn post_nudge(&self, caller: &Identity, request: &Request) -> Result<Option<Response>> {
        if !self.board.take_post_nudge(&caller.username)? {
            return Ok(None);
        }
        let target = if request.has_query() {
            format!("{}?{}", request.path, request.query)
        } else {
            request.path.clone()
        };
        Ok(Some(Response::success(vec![
            format!("Welcome to {}!", self.forum_name()),
            "Thank you for making a post on our bulletin board! Anything you post can be \
             viewed by the entire internet. Please be mindful of what you share, and do not \
             reveal private information."
                .to_string(),
            "This page is shown only once. Follow the link below to continue writing your post."
                .to_string(),
            format!("=> {}", target),
        ])))
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    fn register(&self, request: &Request, rest: &[&str]) -> Result<Response> {
        match rest {
            [] if !request.has_query() => Ok(Response::input("Please enter your username.")),
            [] => {
                let username = validate_username(&unescape_query(&request.query)?)?;
                Ok(Response::redirect(format!("/register/{}/", escape_path(&username))))
            }
            [_] if !request.has_query() => {
                Ok(Response::input("Please enter your email address."))
            }
            [user] => {
                let email = unescape_query(&request.query)?;
                Ok(Response::redirect(format!(
                    "/register/{}/{}/",
                    user,
                    escape_path(email.trim())
                )))
            }
            [_, _] if !request.has_query() => {
                Ok(Response::sensitive_input("Please enter your password."))
            }
            [user, email] => {
                let registration = self.board.register(
                    &unescape_path(user)?,
                    &unescape_path(email)?,
                    &unescape_query(&request.query)?,
                )?;
                if registration.verified {
                    Ok(Response::redirect("/"))
                } else {
                    Ok(Response::success(vec![
                        "# Registration successful".to_string(),
                        "A verification link was sent to your email address.".to_string(),
                        "=> / Back to the front page".to_string(),
                    ]))
                }
            }
            _ => Ok(Response::bad_request("illegal path")),
        }
    }

    fn login(&self, request: &Request, rest: &[&str]) -> Result<Response> {
        let fingerprint = self.certificate(request)?;
        match rest {
            [] if !request.has_query() => Ok(Response::input("Username")),
            [] => {
                let username = unescape_query(&request.query)?;
                let username = username.trim();
                if self.board.user(username)?.is_none() {
                    return Ok(Response::bad_request("Username not found"));
                }
                Ok(Response::redirect(format!("/login/{}/", escape_path(username))))
            }
            [_] if !request.has_query() => Ok(Response::sensitive_input("Password")),
            [user] => {
                self.board.login(
                    &unescape_path(user)?,
                    &unescape_query(&request.query)?,
                    fingerprint,
                )?;
                Ok(Response::redirect("/"))
            }
            _ => Ok(Response::bad_request("illegal path")),
        }
    }

    fn logout(&self, request: &Request) -> Result<Response> {
        self.board.logout(self.certificate(request)?)?;
        Ok(Response::redirect("/"))
    }

    fn verify(&self, rest: &[&str]) -> Result<Response> {
        let [code] = rest else {
            return Ok(Response::bad_request("Bad input"));
        };
        self.board.verify(&unescape_path(code)?)?;
        Ok(Response::redirect("/"))
    }

    // =========================================================================
    // Pages
    // =========================================================================

    fn home(&self, request: &Request) -> Result<Response> {
        let caller = self.board.resolve(request.fingerprint.as_deref());
        let mut lines = vec![format!("# {}", self.forum_name()), String::new()];

        if caller.is_anonymous() {
            lines.push("=> /login/ Log in".to_string());
            lines.push("=> /register/ Register an account".to_string());
        } else {
            lines.push(format!("Logged in as {}.", caller.display_name()));
            if let Some(status) = &caller.mute {
                lines.push(format!("You are {}.", status));
            }
            lines.push("=> /logout/ Log out".to_string());
        }
        lines.push("=> /search/ Search".to_string());

        for forum in &self.board.config().forums {
            lines.push(String::new());
            lines.push(format!("## {}", forum.name));
            for sub in &forum.subforums {
                lines.push(format!("=> /f/{}/ {}", sub.id, sub.name));
            }
        }
        Ok(Response::success(lines))
    }

    fn subforum(&self, rest: &[&str]) -> Result<Response> {
        let [id] = rest else {
            return Ok(Response::bad_request("Bad input"));
        };
        let id = unescape_path(id)?;
        let threads = self.board.list_subforum_threads(&id)?;
        let name = self
            .board
            .config()
            .subforum(&id)
            .map(|s| s.name.clone())
            .unwrap_or_default();

        let mut lines = vec![
            format!("# {}", name),
            format!("=> /new/thread/{}/ Start a new thread", escape_path(&id)),
            String::new(),
        ];
        for thread in threads {
            let marker = if thread.locked { " [locked]" } else { "" };
            lines.push(format!("=> /thread/{}/ {}{}", thread.id, thread.title, marker));
            lines.push(format!(
                "by {}, last active {}",
                self.display_author(&thread.author),
                format_time(thread.last_modified)
            ));
        }
        Ok(Response::success(lines))
    }

    fn thread(&self, rest: &[&str]) -> Result<Response> {
        let [id] = rest else {
            return Ok(Response::bad_request("Bad input"));
        };
        let view = self.board.view_thread(parse_id(id)?)?;
        let reply_line = format!("=> /new/post/{}/ Write a reply", view.thread.id);

        let mut lines = vec![format!("# {}", view.thread.title), reply_line.clone(), String::new()];
        for (i, post) in view.posts.iter().enumerate() {
            lines.push(format!("### {}", self.display_author(&post.author)));
            let hint = if i == 0 { " (click to report)" } else { "" };
            lines.push(format!("=> /report/{}/ {}{}", post.id, format_time(post.time), hint));
            lines.extend(quote(&post.text));
            lines.push(String::new());
        }
        lines.push(reply_line);
        Ok(Response::success(lines))
    }

    fn search(&self, request: &Request) -> Result<Response> {
        if !request.has_query() {
            return Ok(Response::input("keyword or @username search"));
        }
        let query = unescape_query(&request.query)?;
        let query = query.trim();

        if let Some(username) = query.strip_prefix('@') {
            let activity = self.board.search_by_user(username.trim())?;
            let mut lines = vec![format!("# Posts by {}", self.display_author(username.trim()))];
            lines.push(String::new());
            lines.push("## Threads".to_string());
            for hit in activity.threads {
                lines.push(format!("=> /thread/{}/ {}", hit.thread.id, hit.thread.title));
                if let Some(text) = hit.excerpt {
                    lines.extend(quote(&text));
                }
            }
            lines.push(String::new());
            lines.push("## Replies".to_string());
            for hit in activity.posts {
                lines.push(format!(
                    "=> /thread/{}/ Re: {} (by {})",
                    hit.post.thread,
                    hit.thread_title,
                    self.display_author(&hit.thread_author)
                ));
                lines.extend(quote(&hit.post.text));
            }
            return Ok(Response::success(lines));
        }

        let hits = self.board.keyword_search(query)?;
        let mut lines = vec![format!("# Search results for \"{}\"", query), String::new()];
        if hits.is_empty() {
            lines.push("No results.".to_string());
        }
        for hit in hits {
            lines.push(format!(
                "=> /thread/{}/ {} ({})",
                hit.post.thread,
                hit.thread_title,
                self.display_author(&hit.post.author)
            ));
            lines.extend(quote(&hit.post.text));
        }
        Ok(Response::success(lines))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    fn new_thread(&self, request: &Request, rest: &[&str]) -> Result<Response> {
        let caller = self.writer(request)?;
        let (subforum_id, title) = match rest {
            [sf] => (unescape_path(sf)?, None),
            [sf, title] => (unescape_path(sf)?, Some(unescape_path(title)?)),
            _ => return Ok(Response::bad_request("illegal path")),
        };

        let subforum = self
            .board
            .config()
            .subforum(&subforum_id)
            .ok_or(LarigotError::NotFound("subforum"))?;
        if !caller.privilege.is(subforum.thread_privilege) {
            return Err(AuthError::InsufficientPrivilege.into());
        }
        if let Some(nudge) = self.post_nudge(&caller, request)? {
            return Ok(nudge);
        }

        match title {
            None if !request.has_query() => Ok(Response::input("Thread title")),
            None => {
                let title = validate_title(&unescape_query(&request.query)?)?;
                Ok(Response::redirect(format!(
                    "/new/thread/{}/{}/",
                    escape_path(&subforum_id),
                    escape_path(&title)
                )))
            }
            Some(_) if !request.has_query() => Ok(Response::input("Thread text")),
            Some(title) => {
                let text = unescape_query(&request.query)?;
                self.board
                    .create_thread(&caller, &subforum_id, &title, &text)?;
                Ok(Response::redirect(format!("/f/{}/", escape_path(&subforum_id))))
            }
        }
    }

    fn new_post(&self, request: &Request, rest: &[&str]) -> Result<Response> {
        let caller = self.writer(request)?;
        let [id] = rest else {
            return Ok(Response::bad_request("Bad input"));
        };
        let thread_id = parse_id(id)?;

        if let Some(nudge) = self.post_nudge(&caller, request)? {
            return Ok(nudge);
        }
        if !request.has_query() {
            return Ok(Response::input("New post"));
        }

        let text = unescape_query(&request.query)?;
        self.board.reply(&caller, thread_id, &text)?;
        Ok(Response::redirect(format!("/thread/{}/", thread_id)))
    }

    fn report(&self, request: &Request, rest: &[&str]) -> Result<Response> {
        let caller = self.board.resolve(Some(self.certificate(request)?));
        let [id] = rest else {
            return Ok(Response::bad_request("Bad input"));
        };
        let post_id = parse_id(id)?;
        if !request.has_query() {
            return Ok(Response::input("Reason for report"));
        }

        let reason = unescape_query(&request.query)?;
        let post: Post = self
            .board
            .report(&caller, post_id, &reason, &request.peer)?;
        Ok(Response::success(vec![
            "# Report sent".to_string(),
            "Thank you for your report.".to_string(),
            format!("=> /thread/{}/ Back to the thread", post.thread),
        ]))
    }

    fn console(&self, request: &Request) -> Result<Response> {
        let caller = self.board.resolve(Some(self.certificate(request)?));
        if !request.has_query() {
            return Ok(Response::input("Command"));
        }
        let command = unescape_query(&request.query)?;
        let output = self.board.console_command(&caller, &command)?;
        Ok(Response::success(output.lines().map(str::to_string).collect()))
    }

    // =========================================================================
    // Rendering helpers
    // =========================================================================

    fn forum_name(&self) -> &str {
        match self.board.config().forum_name.as_str() {
            "" => "larigot",
            name => name,
        }
    }

    fn display_author(&self, username: &str) -> String {
        display_username(username, self.board.config().privilege_of(username))
    }
}

fn parse_id(raw: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| crate::error::ValidationError::BadInput(format!("not an id: {:?}", raw)).into())
}

fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Post text as quote lines
fn quote(text: &str) -> impl Iterator<Item = String> + '_ {
    text.lines().map(|line| format!("> {}", line))
}
