//! Built-in content bank and demo accounts, so the service is playable without
//! a config file.

use chrono::NaiveDate;

use crate::config::UserCfg;
use crate::domain::{Celebrity, GameMode, QuestionTemplate, TemplateSubject, UserAccount};
use crate::store::MemoryStore;

// (id, full name, dob, sign, category, nationality, hint)
const CELEBRITIES: &[(&str, &str, (i32, u32, u32), &str, &str, &str, &str)] = &[
  ("keanu-reeves", "Keanu Reeves", (1964, 9, 2), "Virgo", "Film", "Canadian", "Starred in The Matrix"),
  ("beyonce", "Beyoncé Knowles", (1981, 9, 4), "Virgo", "Music", "American", "Former Destiny's Child member"),
  ("taylor-swift", "Taylor Swift", (1989, 12, 13), "Sagittarius", "Music", "American", "Began her career in country music"),
  ("lionel-messi", "Lionel Messi", (1987, 6, 24), "Cancer", "Sport", "Argentine", "Won the 2022 World Cup"),
  ("serena-williams", "Serena Williams", (1981, 9, 26), "Libra", "Sport", "American", "23 Grand Slam singles titles"),
  ("meryl-streep", "Meryl Streep", (1949, 6, 22), "Cancer", "Film", "American", "Most Oscar-nominated actor"),
  ("shah-rukh-khan", "Shah Rukh Khan", (1965, 11, 2), "Scorpio", "Film", "Indian", "Known as the King of Bollywood"),
  ("adele", "Adele Adkins", (1988, 5, 5), "Taurus", "Music", "British", "Albums are named after her age"),
  ("cristiano-ronaldo", "Cristiano Ronaldo", (1985, 2, 5), "Aquarius", "Sport", "Portuguese", "Began at Sporting CP"),
  ("oprah-winfrey", "Oprah Winfrey", (1954, 1, 29), "Aquarius", "Television", "American", "Hosted a talk show for 25 seasons"),
  ("zendaya", "Zendaya", (1996, 9, 1), "Virgo", "Film", "American", "Played MJ in Spider-Man"),
  ("david-attenborough", "David Attenborough", (1926, 5, 8), "Taurus", "Television", "British", "Narrated Planet Earth"),
  ("rihanna", "Rihanna", (1988, 2, 20), "Pisces", "Music", "Barbadian", "Founded Fenty Beauty"),
  ("roger-federer", "Roger Federer", (1981, 8, 8), "Leo", "Sport", "Swiss", "Eight Wimbledon singles titles"),
];

const WHO_OLDER_PAIRS: &[(&str, &str)] = &[
  ("beyonce", "serena-williams"),
  ("taylor-swift", "adele"),
  ("lionel-messi", "cristiano-ronaldo"),
  ("keanu-reeves", "shah-rukh-khan"),
  ("meryl-streep", "oprah-winfrey"),
  ("zendaya", "taylor-swift"),
  ("rihanna", "adele"),
  ("roger-federer", "beyonce"),
  ("david-attenborough", "meryl-streep"),
  ("lionel-messi", "rihanna"),
  ("oprah-winfrey", "keanu-reeves"),
  ("serena-williams", "roger-federer"),
];

pub fn seed_celebrities() -> Vec<Celebrity> {
  CELEBRITIES
    .iter()
    .filter_map(|&(id, name, (y, m, d), sign, category, nationality, hint)| {
      Some(Celebrity {
        id: id.into(),
        full_name: name.into(),
        date_of_birth: NaiveDate::from_ymd_opt(y, m, d)?,
        star_sign: Some(sign.into()),
        primary_category: category.into(),
        nationality: Some(nationality.into()),
        hints_easy: vec![hint.into(), format!("Works in {}", category.to_lowercase())],
      })
    })
    .collect()
}

/// One AGE_GUESS template per celebrity, the WHO_OLDER pairs, and a few
/// inactive REVERSE_* templates kept for when those modes get scorers.
pub fn seed_templates() -> Vec<QuestionTemplate> {
  let mut out = Vec::new();
  for (i, c) in CELEBRITIES.iter().enumerate() {
    out.push(QuestionTemplate {
      id: format!("age-{:02}", i + 1),
      mode: GameMode::AgeGuess,
      difficulty: (i % 5) as u8 + 1,
      is_active: true,
      subject: TemplateSubject::Single { celebrity_id: c.0.into() },
    });
  }
  for (i, (a, b)) in WHO_OLDER_PAIRS.iter().enumerate() {
    out.push(QuestionTemplate {
      id: format!("older-{:02}", i + 1),
      mode: GameMode::WhoOlder,
      difficulty: (i % 3) as u8 + 2,
      is_active: true,
      subject: TemplateSubject::Pair {
        celebrity_id_a: (*a).into(),
        celebrity_id_b: (*b).into(),
      },
    });
  }
  for (i, (mode, celeb)) in [
    (GameMode::ReverseDob, "adele"),
    (GameMode::ReverseSign, "zendaya"),
  ]
  .into_iter()
  .enumerate()
  {
    out.push(QuestionTemplate {
      id: format!("reverse-{:02}", i + 1),
      mode,
      difficulty: 4,
      is_active: false,
      subject: TemplateSubject::Single { celebrity_id: celeb.into() },
    });
  }
  out
}

pub fn seed_users() -> Vec<UserCfg> {
  vec![
    UserCfg { id: "demo-alice".into(), display_name: Some("Alice".into()), token: "alice-token".into() },
    UserCfg { id: "demo-bob".into(), display_name: None, token: "bob-token".into() },
  ]
}

/// Fill `store` with the given bank and accounts.
pub async fn load_content(
  store: &MemoryStore,
  users: &[UserCfg],
  celebrities: Vec<Celebrity>,
  templates: Vec<QuestionTemplate>,
) {
  for u in users {
    store
      .put_user(UserAccount { id: u.id.clone(), display_name: u.display_name.clone() })
      .await;
  }
  for c in celebrities {
    store.put_celebrity(c).await;
  }
  for t in templates {
    store.put_template(t).await;
  }
}

/// A store holding the built-in bank and demo accounts.
pub async fn seeded_store() -> MemoryStore {
  let store = MemoryStore::new();
  load_content(&store, &seed_users(), seed_celebrities(), seed_templates()).await;
  store
}
