use gems::db::Database;
use gems::models::*;
use speculate2::speculate;
use uuid::Uuid;

fn create_test_user(db: &Database, username: &str) -> IssuedUser {
    db.create_user(CreateUserInput {
        username: username.to_string(),
    })
    .expect("Failed to create user")
}

fn create_test_gem(db: &Database, owner: UserId, name: &str) -> Gem {
    db.create_gem(
        owner,
        CreateGemInput {
            name: name.to_string(),
            color: "red".to_string(),
            easy_to_find: false,
        },
    )
    .expect("Failed to create gem")
}

fn comment(body: &str) -> CreateCommentInput {
    let mut input = CreateCommentInput::default();
    input.fields.insert("body".to_string(), body.into());
    input
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
        let alice = create_test_user(&db, "alice");
        let bob = create_test_user(&db, "bob");
    }

    describe "users" {
        describe "create_user" {
            it "issues a token that resolves back to the user" {
                let found = db.find_user_by_token(&alice.token).expect("Query failed");
                assert_eq!(found.map(|u| u.id), Some(alice.user.id));
            }

            it "stores only a hash of the token" {
                assert_ne!(alice.user.token_hash, alice.token);
                let stored = db.get_user(alice.user.id).expect("Query failed").unwrap();
                assert_eq!(stored.token_hash, alice.user.token_hash);
            }

            it "rejects duplicate usernames" {
                let result = db.create_user(CreateUserInput {
                    username: "alice".to_string(),
                });
                assert!(result.is_err());
            }
        }

        describe "find_user_by_token" {
            it "returns None for an unknown token" {
                let found = db.find_user_by_token("nope").expect("Query failed");
                assert!(found.is_none());
            }

            it "does not match another user's token" {
                let found = db.find_user_by_token(&bob.token).expect("Query failed").unwrap();
                assert_ne!(found.id, alice.user.id);
            }
        }
    }

    describe "gems" {
        describe "create_gem" {
            it "binds the owner and starts at version 1" {
                let gem = create_test_gem(&db, alice.user.id, "Ruby");

                assert_eq!(gem.owner, alice.user.id);
                assert_eq!(gem.version, 1);
                assert!(gem.comments.is_empty());
            }
        }

        describe "get_gem" {
            it "returns None for non-existent gem" {
                let result = db.get_gem(Uuid::new_v4()).expect("Query failed");
                assert!(result.is_none());
            }

            it "returns the stored document" {
                let created = create_test_gem(&db, alice.user.id, "Ruby");

                let found = db.get_gem(created.id).expect("Query failed").unwrap();
                assert_eq!(found.name, "Ruby");
                assert_eq!(found.owner, alice.user.id);
                assert_eq!(found.version, 1);
            }
        }

        describe "get_gems_by_owner" {
            it "returns only the owner's gems" {
                create_test_gem(&db, alice.user.id, "Ruby");
                create_test_gem(&db, bob.user.id, "Pearl");

                let gems = db.get_gems_by_owner(bob.user.id).expect("Query failed");
                assert_eq!(gems.len(), 1);
                assert_eq!(gems[0].name, "Pearl");
            }
        }

        describe "save_gem" {
            it "persists fields and embedded comments" {
                let mut gem = create_test_gem(&db, alice.user.id, "Ruby");
                gem.color = "crimson".to_string();
                gem.push_comment(bob.user.id, comment("Nice"));

                let saved = db.save_gem(&gem).expect("Save failed").unwrap();
                assert_eq!(saved.version, 2);

                let found = db.get_gem(gem.id).expect("Query failed").unwrap();
                assert_eq!(found.color, "crimson");
                assert_eq!(found.comments.len(), 1);
                assert_eq!(found.comments[0].author, bob.user.id);
                assert_eq!(found.version, 2);
            }

            it "round-trips free-form comment fields" {
                let mut gem = create_test_gem(&db, alice.user.id, "Ruby");
                let mut input = comment("Nice");
                input.fields.insert("rating".to_string(), 5.into());
                gem.push_comment(bob.user.id, input);
                db.save_gem(&gem).expect("Save failed");

                let view = db.get_gem_view(gem.id).expect("Query failed").unwrap();
                assert_eq!(view.comments[0].text("body"), Some("Nice"));
                assert_eq!(view.comments[0].fields["rating"], 5);
            }

            it "rejects a write based on a stale read" {
                let gem = create_test_gem(&db, alice.user.id, "Ruby");
                let mut first = db.get_gem(gem.id).unwrap().unwrap();
                let mut second = db.get_gem(gem.id).unwrap().unwrap();

                first.push_comment(alice.user.id, comment("first"));
                second.push_comment(bob.user.id, comment("second"));

                assert!(db.save_gem(&first).expect("Save failed").is_some());
                assert!(db.save_gem(&second).expect("Save failed").is_none());

                let found = db.get_gem(gem.id).unwrap().unwrap();
                assert_eq!(found.comments.len(), 1);
                assert_eq!(found.comments[0].text("body"), Some("first"));
            }

            it "never changes the stored owner" {
                let mut gem = create_test_gem(&db, alice.user.id, "Ruby");
                gem.owner = bob.user.id;

                db.save_gem(&gem).expect("Save failed");

                let found = db.get_gem(gem.id).unwrap().unwrap();
                assert_eq!(found.owner, alice.user.id);
            }

            it "returns None for a deleted gem" {
                let gem = create_test_gem(&db, alice.user.id, "Ruby");
                db.delete_gem(gem.id).expect("Delete failed");

                assert!(db.save_gem(&gem).expect("Save failed").is_none());
            }
        }

        describe "delete_gem" {
            it "removes the gem and its comments" {
                let mut gem = create_test_gem(&db, alice.user.id, "Ruby");
                gem.push_comment(bob.user.id, comment("Nice"));
                db.save_gem(&gem).expect("Save failed");

                assert!(db.delete_gem(gem.id).expect("Delete failed"));
                assert!(db.get_gem(gem.id).expect("Query failed").is_none());
            }

            it "returns false for non-existent gem" {
                assert!(!db.delete_gem(Uuid::new_v4()).expect("Delete failed"));
            }
        }
    }

    describe "views" {
        it "resolves owner and comment authors to usernames" {
            let mut gem = create_test_gem(&db, alice.user.id, "Ruby");
            gem.push_comment(bob.user.id, comment("Nice"));
            db.save_gem(&gem).expect("Save failed");

            let view = db.get_gem_view(gem.id).expect("Query failed").unwrap();
            assert_eq!(view.owner.username.as_deref(), Some("alice"));
            assert_eq!(view.comments[0].author.username.as_deref(), Some("bob"));
        }

        it "leaves unknown users unresolved" {
            let ghost = Uuid::new_v4();
            let gem = create_test_gem(&db, ghost, "Ruby");

            let view = db.get_gem_view(gem.id).expect("Query failed").unwrap();
            assert_eq!(view.owner, UserSummary::unresolved(ghost));
        }

        it "lists all gems in creation order" {
            create_test_gem(&db, alice.user.id, "Ruby");
            create_test_gem(&db, bob.user.id, "Pearl");

            let views = db.get_all_gem_views().expect("Query failed");
            let names: Vec<&str> = views.iter().map(|v| v.name.as_str()).collect();
            assert_eq!(names, vec!["Ruby", "Pearl"]);
        }
    }

    describe "on-disk database" {
        it "persists across reopen" {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            let path = dir.path().join("gems.db");

            let id = {
                let disk = Database::open(path.clone()).expect("Failed to open");
                disk.migrate().expect("Failed to migrate");
                let owner = create_test_user(&disk, "carol");
                create_test_gem(&disk, owner.user.id, "Opal").id
            };

            let reopened = Database::open(path).expect("Failed to reopen");
            reopened.migrate().expect("Failed to migrate");
            let gem = reopened.get_gem(id).expect("Query failed").unwrap();
            assert_eq!(gem.name, "Opal");
        }
    }
}
