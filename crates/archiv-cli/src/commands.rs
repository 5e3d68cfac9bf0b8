//! Subcommands and their mapping onto [`ArchiveStore`] calls.
//!
//! Every command produces a JSON value; printing is left to `main`.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use archiv_core::{
  Entity,
  blob::Upload,
  category::NewCategory,
  dating::{Century, DatingInput, DatingMode},
  object::{
    ArchivedObject, DetailsInput, DocumentInput, Language, ObjectFields, ObjectKind,
    PhotographInput,
  },
  person::{NewPerson, Sex},
  store::ArchiveStore,
};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;

// ─── Arguments ────────────────────────────────────────────────────────────────

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Number of documents, photographs and persons.
  Stats,
  #[command(subcommand)]
  Person(PersonCommand),
  #[command(subcommand)]
  Category(CategoryCommand),
  #[command(subcommand)]
  Document(DocumentCommand),
  #[command(subcommand)]
  Photo(PhotoCommand),
  /// Commands that work on either variant.
  #[command(subcommand)]
  Object(ObjectCommand),
}

#[derive(Subcommand, Debug)]
pub enum PersonCommand {
  Add(PersonArgs),
  /// Change the given fields of a person, keeping the rest.
  Edit(PersonEditArgs),
  List,
  /// Objects referring to the person keep a cleared reference.
  Delete { id: Uuid },
}

#[derive(Args, Debug)]
pub struct PersonArgs {
  #[arg(long)]
  pub given:  String,
  #[arg(long)]
  pub family: String,
  #[arg(long, value_name = "YYYY-MM-DD")]
  pub born:   Option<NaiveDate>,
  #[arg(long, value_name = "YYYY-MM-DD")]
  pub died:   Option<NaiveDate>,
  /// M or F.
  #[arg(long)]
  pub sex:    Option<Sex>,
}

#[derive(Args, Debug)]
pub struct PersonEditArgs {
  pub id:         Uuid,
  #[arg(long)]
  pub given:      Option<String>,
  #[arg(long)]
  pub family:     Option<String>,
  #[arg(long, value_name = "YYYY-MM-DD", conflicts_with = "clear_born")]
  pub born:       Option<NaiveDate>,
  #[arg(long, value_name = "YYYY-MM-DD", conflicts_with = "clear_died")]
  pub died:       Option<NaiveDate>,
  #[arg(long, conflicts_with = "clear_sex")]
  pub sex:        Option<Sex>,
  #[arg(long)]
  pub clear_born: bool,
  #[arg(long)]
  pub clear_died: bool,
  #[arg(long)]
  pub clear_sex:  bool,
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
  Add {
    name:        String,
    #[arg(long, default_value = "")]
    description: String,
  },
  List,
  /// Refused while any document is filed under the category.
  Delete { id: Uuid },
}

#[derive(Subcommand, Debug)]
pub enum DocumentCommand {
  Add(DocumentAddArgs),
}

#[derive(Subcommand, Debug)]
pub enum PhotoCommand {
  Add(PhotoAddArgs),
}

#[derive(Subcommand, Debug)]
pub enum ObjectCommand {
  Show { id: Uuid },
  List {
    #[arg(long)]
    kind: Option<ObjectKind>,
  },
  /// Resubmit an object with the given fields changed.
  Update(ObjectUpdateArgs),
  /// Delete an object together with its file.
  Delete { id: Uuid },
}

/// Exactly one of these is expected; extra values are reported, not dropped.
#[derive(Args, Debug, Default)]
pub struct DatingArgs {
  #[arg(long, value_name = "YYYY-MM-DD")]
  pub date:    Option<NaiveDate>,
  #[arg(long)]
  pub year:    Option<i32>,
  /// Century code, 15 to 21.
  #[arg(long, value_name = "CODE")]
  pub century: Option<Century>,
}

impl DatingArgs {
  pub fn is_empty(&self) -> bool {
    self.date.is_none() && self.year.is_none() && self.century.is_none()
  }

  /// The mode follows the most precise value given.
  pub fn to_input(&self) -> DatingInput {
    let mode = if self.date.is_some() {
      DatingMode::PreciseDate
    } else if self.year.is_some() {
      DatingMode::Year
    } else if self.century.is_some() {
      DatingMode::Century
    } else {
      DatingMode::None
    };
    DatingInput {
      mode,
      precise_date: self.date,
      year: self.year,
      century: self.century,
    }
  }
}

#[derive(Args, Debug, Default)]
pub struct CommonArgs {
  #[command(flatten)]
  pub dating:      DatingArgs,
  #[arg(long)]
  pub description: Option<String>,
  /// Defaults to today for new objects.
  #[arg(long, value_name = "YYYY-MM-DD")]
  pub archived_on: Option<NaiveDate>,
  /// Associated person, repeatable. The first one is the primary person.
  #[arg(long = "person", value_name = "ID")]
  pub people:      Vec<Uuid>,
  /// File to attach, replacing any current one.
  #[arg(long, value_name = "PATH")]
  pub file:        Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub struct DocumentArgs {
  #[arg(long, value_name = "ID")]
  pub category: Option<Uuid>,
  /// Language code (cs, sk, en, de, pl, fr, la, ru, jin).
  #[arg(long)]
  pub language: Option<Language>,
}

#[derive(Args, Debug, Default)]
pub struct PhotoArgs {
  #[arg(long)]
  pub photo_type: Option<String>,
  #[arg(long, value_name = "CM")]
  pub height:     Option<u32>,
  #[arg(long, value_name = "CM")]
  pub width:      Option<u32>,
}

#[derive(Args, Debug)]
pub struct DocumentAddArgs {
  #[command(flatten)]
  pub common:   CommonArgs,
  #[command(flatten)]
  pub document: DocumentArgs,
}

#[derive(Args, Debug)]
pub struct PhotoAddArgs {
  #[command(flatten)]
  pub common: CommonArgs,
  #[command(flatten)]
  pub photo:  PhotoArgs,
}

#[derive(Args, Debug)]
pub struct ObjectUpdateArgs {
  pub id:           Uuid,
  #[command(flatten)]
  pub common:       CommonArgs,
  /// Drop every associated person.
  #[arg(long, conflicts_with = "people")]
  pub clear_people: bool,
  #[command(flatten)]
  pub document:     DocumentArgs,
  #[command(flatten)]
  pub photo:        PhotoArgs,
}

// ─── Output ───────────────────────────────────────────────────────────────────

/// An object as printed: the stored record plus its rendered dating.
#[derive(Serialize)]
struct ObjectView<'a> {
  kind:     ObjectKind,
  #[serde(flatten)]
  object:   &'a ArchivedObject,
  datation: String,
}

fn object_json(object: &ArchivedObject) -> anyhow::Result<Value> {
  Ok(serde_json::to_value(ObjectView {
    kind: object.kind(),
    object,
    datation: object.datation_display(),
  })?)
}

fn deleted(entity: Entity, id: Uuid) -> Value {
  json!({ "deleted": entity.to_string(), "id": id })
}

// ─── Dispatch ─────────────────────────────────────────────────────────────────

pub async fn run<S: ArchiveStore>(store: &S, command: Command) -> anyhow::Result<Value> {
  match command {
    Command::Stats => {
      let counts = store.count_by_variant().await?;
      let persons = store.count_persons().await?;
      Ok(json!({
        "documents":   counts.document,
        "photographs": counts.photograph,
        "persons":     persons,
      }))
    }
    Command::Person(command) => person(store, command).await,
    Command::Category(command) => category(store, command).await,
    Command::Document(DocumentCommand::Add(args)) => {
      let details = DetailsInput::Document(DocumentInput {
        category_id: args.document.category,
        language:    args.document.language,
      });
      let fields = new_fields(args.common, details).await?;
      object_json(&store.create_object(fields).await?)
    }
    Command::Photo(PhotoCommand::Add(args)) => {
      let details = DetailsInput::Photograph(PhotographInput {
        photo_type: args.photo.photo_type.unwrap_or_default(),
        height_cm:  args.photo.height,
        width_cm:   args.photo.width,
      });
      let fields = new_fields(args.common, details).await?;
      object_json(&store.create_object(fields).await?)
    }
    Command::Object(command) => object(store, command).await,
  }
}

async fn person<S: ArchiveStore>(store: &S, command: PersonCommand) -> anyhow::Result<Value> {
  match command {
    PersonCommand::Add(args) => {
      let input = NewPerson {
        born: args.born,
        died: args.died,
        sex: args.sex,
        ..NewPerson::new(args.given, args.family)
      };
      Ok(serde_json::to_value(store.create_person(input).await?)?)
    }
    PersonCommand::Edit(args) => {
      let current = store
        .get_person(args.id)
        .await?
        .ok_or(archiv_core::Error::not_found(Entity::Person, args.id))?;
      let input = edit_person(current.to_input(), args);
      let id = current.person_id;
      Ok(serde_json::to_value(store.update_person(id, input).await?)?)
    }
    PersonCommand::List => Ok(serde_json::to_value(store.list_persons().await?)?),
    PersonCommand::Delete { id } => {
      store.delete_person(id).await?;
      Ok(deleted(Entity::Person, id))
    }
  }
}

fn edit_person(mut input: NewPerson, args: PersonEditArgs) -> NewPerson {
  if let Some(given) = args.given {
    input.given_name = given;
  }
  if let Some(family) = args.family {
    input.family_name = family;
  }
  if args.clear_born {
    input.born = None;
  } else if args.born.is_some() {
    input.born = args.born;
  }
  if args.clear_died {
    input.died = None;
  } else if args.died.is_some() {
    input.died = args.died;
  }
  if args.clear_sex {
    input.sex = None;
  } else if args.sex.is_some() {
    input.sex = args.sex;
  }
  input
}

async fn category<S: ArchiveStore>(store: &S, command: CategoryCommand) -> anyhow::Result<Value> {
  match command {
    CategoryCommand::Add { name, description } => {
      let category = store.create_category(NewCategory::new(name, description)).await?;
      Ok(serde_json::to_value(category)?)
    }
    CategoryCommand::List => Ok(serde_json::to_value(store.list_categories().await?)?),
    CategoryCommand::Delete { id } => {
      store.delete_category(id).await?;
      Ok(deleted(Entity::Category, id))
    }
  }
}

async fn object<S: ArchiveStore>(store: &S, command: ObjectCommand) -> anyhow::Result<Value> {
  match command {
    ObjectCommand::Show { id } => {
      let object = store
        .get_object(id)
        .await?
        .ok_or(archiv_core::Error::not_found(Entity::Object, id))?;
      object_json(&object)
    }
    ObjectCommand::List { kind } => {
      let objects = store.list_objects(kind).await?;
      Ok(Value::Array(objects.iter().map(object_json).collect::<anyhow::Result<_>>()?))
    }
    ObjectCommand::Update(args) => {
      let current = store
        .get_object(args.id)
        .await?
        .ok_or(archiv_core::Error::not_found(Entity::Object, args.id))?;
      let fields = edit_fields(&current, args).await?;
      object_json(&store.update_object(current.object_id, fields).await?)
    }
    ObjectCommand::Delete { id } => {
      store.delete_object(id).await?;
      Ok(deleted(Entity::Object, id))
    }
  }
}

// ─── Field assembly ───────────────────────────────────────────────────────────

async fn new_fields(common: CommonArgs, details: DetailsInput) -> anyhow::Result<ObjectFields> {
  let mut fields = ObjectFields::new(common.dating.to_input(), details);
  fields.archived_on = common.archived_on;
  fields.description = common.description.unwrap_or_default();
  fields.people = common.people;
  fields.upload = read_upload(common.file.as_deref()).await?;
  Ok(fields)
}

/// Start from what is stored and apply only the flags that were given.
async fn edit_fields(
  current: &ArchivedObject,
  args: ObjectUpdateArgs,
) -> anyhow::Result<ObjectFields> {
  let mut fields = current.edit_fields();
  let common = args.common;

  if !common.dating.is_empty() {
    fields.dating = common.dating.to_input();
  }
  if let Some(description) = common.description {
    fields.description = description;
  }
  if common.archived_on.is_some() {
    fields.archived_on = common.archived_on;
  }
  if args.clear_people {
    fields.people.clear();
  } else if !common.people.is_empty() {
    fields.people = common.people;
  }
  fields.upload = read_upload(common.file.as_deref()).await?;

  match &mut fields.details {
    DetailsInput::Document(document) => {
      if args.photo.photo_type.is_some() || args.photo.height.is_some() || args.photo.width.is_some()
      {
        bail!("photograph fields given for a document");
      }
      if args.document.category.is_some() {
        document.category_id = args.document.category;
      }
      if args.document.language.is_some() {
        document.language = args.document.language;
      }
    }
    DetailsInput::Photograph(photo) => {
      if args.document.category.is_some() || args.document.language.is_some() {
        bail!("document fields given for a photograph");
      }
      if let Some(photo_type) = args.photo.photo_type {
        photo.photo_type = photo_type;
      }
      if args.photo.height.is_some() {
        photo.height_cm = args.photo.height;
      }
      if args.photo.width.is_some() {
        photo.width_cm = args.photo.width;
      }
    }
  }
  Ok(fields)
}

async fn read_upload(path: Option<&Path>) -> anyhow::Result<Option<Upload>> {
  let Some(path) = path else {
    return Ok(None);
  };
  let bytes = tokio::fs::read(path)
    .await
    .with_context(|| format!("failed to read {}", path.display()))?;
  let file_name = path
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_else(|| "file".to_owned());
  Ok(Some(Upload::new(file_name, bytes)))
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use archiv_core::blob::MemoryBlobStore;
  use archiv_store_sqlite::SqliteStore;
  use clap::Parser;

  use super::*;

  #[derive(Parser)]
  struct TestCli {
    #[command(subcommand)]
    command: Command,
  }

  fn parse(args: &[&str]) -> Command {
    let argv = std::iter::once("archiv").chain(args.iter().copied());
    TestCli::try_parse_from(argv).unwrap().command
  }

  async fn store() -> SqliteStore {
    SqliteStore::open_in_memory(Arc::new(MemoryBlobStore::new()))
      .await
      .unwrap()
  }

  #[test]
  fn dating_mode_follows_the_most_precise_value() {
    let args = DatingArgs { year: Some(1950), ..Default::default() };
    assert_eq!(args.to_input(), DatingInput::year(1950));

    let args = DatingArgs {
      year: Some(1850),
      century: Some(Century::Nineteenth),
      ..Default::default()
    };
    let input = args.to_input();
    assert_eq!(input.mode, DatingMode::Year);
    assert_eq!(input.century, Some(Century::Nineteenth));

    assert_eq!(DatingArgs::default().to_input().mode, DatingMode::None);
  }

  #[test]
  fn codes_parse_from_the_command_line() {
    let Command::Photo(PhotoCommand::Add(args)) =
      parse(&["photo", "add", "--century", "19", "--height", "10", "--width", "15"])
    else {
      panic!("expected photo add");
    };
    assert_eq!(args.common.dating.century, Some(Century::Nineteenth));
    assert_eq!(args.photo.height, Some(10));

    let Command::Document(DocumentCommand::Add(args)) =
      parse(&["document", "add", "--year", "1950", "--language", "de"])
    else {
      panic!("expected document add");
    };
    assert_eq!(args.document.language, Some(Language::German));
  }

  #[tokio::test]
  async fn add_update_and_show_a_document() {
    let s = store().await;
    let anna = run(&s, parse(&["person", "add", "--given", "Anna", "--family", "Nováková"]))
      .await
      .unwrap();
    let anna_id = anna["person_id"].as_str().unwrap().to_owned();

    let created = run(
      &s,
      parse(&["document", "add", "--year", "1950", "--person", anna_id.as_str()]),
    )
    .await
    .unwrap();
    assert_eq!(created["kind"], "document");
    assert_eq!(created["datation"], "1950");
    assert_eq!(created["primary_person"], anna_id.as_str());
    let id = created["object_id"].as_str().unwrap().to_owned();

    let updated = run(
      &s,
      parse(&["object", "update", id.as_str(), "--century", "20", "--clear-people"]),
    )
    .await
    .unwrap();
    assert_eq!(updated["datation"], "20. století");
    assert_eq!(updated["primary_person"], Value::Null);

    let stats = run(&s, parse(&["stats"])).await.unwrap();
    assert_eq!(stats, json!({ "documents": 1, "photographs": 0, "persons": 1 }));
  }

  #[tokio::test]
  async fn over_specified_dating_is_reported() {
    let s = store().await;
    let err = run(
      &s,
      parse(&[
        "photo", "add", "--century", "19", "--year", "1850", "--height", "10", "--width", "15",
      ]),
    )
    .await
    .unwrap_err();

    let err = err.downcast_ref::<archiv_store_sqlite::Error>().unwrap();
    assert!(err.validation().unwrap().contains("dating", "only one dating field may be filled"));
  }

  #[tokio::test]
  async fn wrong_variant_flags_are_refused() {
    let s = store().await;
    let created = run(&s, parse(&["document", "add", "--year", "1950"])).await.unwrap();
    let id = created["object_id"].as_str().unwrap().to_owned();

    let err = run(&s, parse(&["object", "update", id.as_str(), "--height", "12"]))
      .await
      .unwrap_err();
    assert!(err.to_string().contains("photograph fields"));
  }

  #[test]
  fn person_edit_keeps_unmentioned_fields() {
    let mut input = NewPerson::new("Anna", "Nováková");
    input.sex = Some(Sex::Female);

    let id = Uuid::nil().to_string();
    let Command::Person(PersonCommand::Edit(args)) =
      parse(&["person", "edit", id.as_str(), "--family", "Dvořáková"])
    else {
      panic!("expected person edit");
    };

    let edited = edit_person(input, args);
    assert_eq!(edited.given_name, "Anna");
    assert_eq!(edited.family_name, "Dvořáková");
    assert_eq!(edited.sex, Some(Sex::Female));
  }
}
