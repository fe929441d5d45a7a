//! Demo users, servers and tabs for local development.
//!
//! Rows are flagged `is_test` and looked up by name before being created, so
//! seeding on every start leaves a single copy.

use chatter_store::{Database, Result, Server, Tab, User};
use tracing::info;

const DEMO_PASSWORD: &str = "123";

const USERS: [&str; 6] = ["nikos", "maria", "rinos", "nisfa", "gkai", "mitsos"];

/// Server name and the indices into [`USERS`] of its members.
const SERVERS: [(&str, &[usize]); 4] = [
    ("Gamiades", &[0, 1, 2]),
    ("HUA", &[3, 4, 5]),
    ("CTF", &[1, 3, 5]),
    ("ArchUsers", &[0, 2, 4]),
];

/// Tab name and the indices into [`SERVERS`] it is created on.
const TABS: [(&str, &[usize]); 3] = [
    ("General", &[0, 1, 2]),
    ("Memes", &[0, 1, 2, 3]),
    ("Studying", &[2, 3]),
];

/// Summary of what a seeding run created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub servers: usize,
    pub tabs: usize,
}

pub fn seed_demo_data(db: &Database) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    let mut users = Vec::with_capacity(USERS.len());
    for name in USERS {
        let user = match db.find_test_user(name)? {
            Some(existing) => existing,
            None => {
                let mut user = User::new(name, DEMO_PASSWORD);
                user.is_test = true;
                db.create_user(&user)?;
                report.users += 1;
                user
            }
        };
        users.push(user);
    }

    let mut servers = Vec::with_capacity(SERVERS.len());
    for (name, members) in SERVERS {
        let server = match db.find_test_server(name)? {
            Some(existing) => existing,
            None => {
                let mut server = Server::new(name);
                server.is_test = true;
                db.create_server(&server)?;
                report.servers += 1;
                server
            }
        };
        for &i in members {
            db.add_user_to_server(users[i].id, server.id)?;
        }
        servers.push(server);
    }

    for (name, on) in TABS {
        for &i in on {
            let server_id = servers[i].id;
            let exists = db
                .list_tabs_for_server(server_id)?
                .iter()
                .any(|tab| tab.name == name);
            if !exists {
                db.create_tab(&Tab::new(name, server_id))?;
                report.tabs += 1;
            }
        }
    }

    info!(
        users = report.users,
        servers = report.servers,
        tabs = report.tabs,
        "Demo data seeded"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_fixed_layout() {
        let db = Database::open_in_memory().unwrap();

        let report = seed_demo_data(&db).unwrap();
        assert_eq!(
            report,
            SeedReport {
                users: 6,
                servers: 4,
                tabs: 9
            }
        );

        let ctf = db.find_test_server("CTF").unwrap().unwrap();
        let mut members: Vec<_> = db
            .get_server_users(ctf.id)
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        members.sort();
        assert_eq!(members, vec!["maria", "mitsos", "nisfa"]);

        let arch = db.find_test_server("ArchUsers").unwrap().unwrap();
        let tabs: Vec<_> = db
            .list_tabs_for_server(arch.id)
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(tabs, vec!["Memes", "Studying"]);
    }

    #[test]
    fn reseeding_creates_nothing() {
        let db = Database::open_in_memory().unwrap();
        seed_demo_data(&db).unwrap();

        let again = seed_demo_data(&db).unwrap();
        assert_eq!(again, SeedReport::default());
        assert_eq!(db.list_users().unwrap().len(), 6);
        assert_eq!(db.list_tabs().unwrap().len(), 9);
    }
}
