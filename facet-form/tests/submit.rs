use std::cell::{Cell, RefCell};
use std::rc::Rc;

use facet_form::{
    ChangeSet, Form, FormError, FormOptions, Outline, SubmitOutcome, ValidationContext, Value,
    form_model,
};
use facet_form_testhelpers::{capture_logs, logged};
use log::Level;

form_model! {
    #[derive(Debug, Default)]
    pub struct Person {
        pub age: i32,
        pub name: String,
    }
}

fn changes(entries: &[(&str, Value)]) -> ChangeSet {
    entries
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

fn drawn(form: &Form<Person, Outline>) -> eyre::Result<Outline> {
    let mut outline = Outline::new();
    form.render(&mut outline)?;
    Ok(outline)
}

fn set(outline: &Outline, name: &str, value: impl Into<Value>) -> eyre::Result<()> {
    outline
        .binding(name)
        .ok_or_else(|| eyre::eyre!("{name} was not bound"))?
        .set(value)?;
    Ok(())
}

fn recording_form(
    model: Rc<RefCell<Person>>,
) -> (Form<Person, Outline>, Rc<RefCell<Vec<ChangeSet>>>) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let form = Form::<Person, Outline>::builder(model)
        .on_valid_submit(move |args| {
            sink.borrow_mut().push(args.changes.clone());
            Ok(())
        })
        .build();
    (form, seen)
}

#[test]
fn submit_hands_every_edit_to_the_handler() -> eyre::Result<()> {
    facet_form_testhelpers::setup();

    let person = Rc::new(RefCell::new(Person::default()));
    let (form, seen) = recording_form(person.clone());

    let outline = drawn(&form)?;
    set(&outline, "age", 30)?;
    set(&outline, "name", "Ann")?;
    assert!(form.has_unsaved_changes());

    let expected = changes(&[("age", Value::I64(30)), ("name", Value::String("Ann".into()))]);
    assert_eq!(form.submit(true)?, SubmitOutcome::Submitted(expected.clone()));
    assert_eq!(*seen.borrow(), [expected]);
    assert!(!form.has_unsaved_changes());
    assert_eq!(person.borrow().name, "Ann");
    Ok(())
}

#[test]
fn submitting_again_without_edits_sends_nothing() -> eyre::Result<()> {
    facet_form_testhelpers::setup();

    let (form, seen) = recording_form(Rc::new(RefCell::new(Person::default())));
    let outline = drawn(&form)?;
    set(&outline, "age", 1)?;

    form.submit(false)?;
    assert_eq!(form.submit(false)?, SubmitOutcome::Submitted(ChangeSet::new()));
    assert_eq!(seen.borrow().len(), 2);
    assert!(seen.borrow()[1].is_empty());
    Ok(())
}

#[test]
fn the_same_field_on_two_models_is_reported_once() -> eyre::Result<()> {
    facet_form_testhelpers::setup();

    let first = Rc::new(RefCell::new(Person::default()));
    let second = Rc::new(RefCell::new(Person::default()));
    let (form, _) = recording_form(first.clone());

    set(&drawn(&form)?, "age", 10)?;
    form.set_model(second.clone());
    set(&drawn(&form)?, "age", 40)?;
    assert_eq!(form.dirty_fields().len(), 2);

    // values are read from the model being edited now
    assert_eq!(
        form.submit(false)?,
        SubmitOutcome::Submitted(changes(&[("age", Value::I64(40))]))
    );
    assert_eq!(first.borrow().age, 10);
    Ok(())
}

fn age_must_be_positive(person: &Person, context: &mut ValidationContext) -> bool {
    if person.age > 0 {
        return true;
    }
    context.add_message_for("age", "must be positive");
    false
}

#[test]
fn invalid_standalone_form_keeps_its_edits() -> eyre::Result<()> {
    facet_form_testhelpers::setup();

    let called = Rc::new(Cell::new(false));
    let flag = called.clone();
    let form = Form::<Person, Outline>::builder(Rc::new(RefCell::new(Person::default())))
        .validator(age_must_be_positive)
        .on_valid_submit(move |_| {
            flag.set(true);
            Ok(())
        })
        .build();
    set(&drawn(&form)?, "age", -3)?;

    let (outcome, records) = capture_logs(|| form.submit(true));
    assert_eq!(outcome?, SubmitOutcome::Invalid);
    assert!(logged(&records, Level::Warn, "Person: not valid"));
    assert!(!called.get());
    assert!(form.has_unsaved_changes());

    let validation = form.validation();
    let age = validation
        .reference("age")
        .ok_or_else(|| eyre::eyre!("age has no reference"))?;
    assert_eq!(validation.messages_for(age), ["must be positive"]);
    assert!(validation.reference("name").is_some());

    set(&drawn(&form)?, "age", 5)?;
    assert!(matches!(form.submit(true)?, SubmitOutcome::Submitted(_)));
    assert!(called.get());
    assert!(form.validation().is_clean());
    Ok(())
}

#[test]
fn disabled_validation_skips_the_validator() -> eyre::Result<()> {
    facet_form_testhelpers::setup();

    let form = Form::<Person, Outline>::builder(Rc::new(RefCell::new(Person::default())))
        .options(FormOptions::default().with_validation(false))
        .validator(|_: &Person, _: &mut ValidationContext| false)
        .build();
    assert_eq!(form.submit(false)?, SubmitOutcome::Submitted(ChangeSet::new()));
    Ok(())
}

#[test]
fn handler_failure_surfaces_after_the_edits_are_consumed() -> eyre::Result<()> {
    facet_form_testhelpers::setup();

    let form = Form::<Person, Outline>::new(Rc::new(RefCell::new(Person::default())));
    form.on_valid_submit(|_| Err("storage is offline".into()));
    set(&drawn(&form)?, "name", "Ann")?;

    let err = form.submit(true).unwrap_err();
    assert!(matches!(&err, FormError::Handler(inner) if inner.to_string() == "storage is offline"));
    assert!(!form.has_unsaved_changes());
    Ok(())
}

#[test]
fn submit_from_inside_the_handler_is_queued() -> eyre::Result<()> {
    facet_form_testhelpers::setup();

    let form = Rc::new(Form::<Person, Outline>::new(Rc::new(RefCell::new(
        Person::default(),
    ))));
    let calls = Rc::new(Cell::new(0));
    let nested = Rc::new(RefCell::new(Vec::new()));

    let weak = Rc::downgrade(&form);
    let counter = calls.clone();
    let outcomes = nested.clone();
    form.on_valid_submit(move |_| {
        counter.set(counter.get() + 1);
        if counter.get() == 1 {
            if let Some(form) = weak.upgrade() {
                outcomes.borrow_mut().push(form.submit(false)?);
            }
        }
        Ok(())
    });

    assert!(matches!(form.submit(true)?, SubmitOutcome::Submitted(_)));
    assert_eq!(*nested.borrow(), [SubmitOutcome::Queued]);
    assert_eq!(calls.get(), 2);
    Ok(())
}

#[test]
fn a_failing_queued_submit_does_not_undo_the_one_that_ran() -> eyre::Result<()> {
    facet_form_testhelpers::setup();

    let form = Rc::new(Form::<Person, Outline>::new(Rc::new(RefCell::new(
        Person::default(),
    ))));
    let calls = Rc::new(Cell::new(0));

    let weak = Rc::downgrade(&form);
    let counter = calls.clone();
    form.on_valid_submit(move |_| {
        counter.set(counter.get() + 1);
        match counter.get() {
            1 => {
                if let Some(form) = weak.upgrade() {
                    form.submit(false)?;
                }
                Ok(())
            }
            2 => Err("storage is offline".into()),
            _ => Ok(()),
        }
    });
    set(&drawn(&form)?, "name", "Ann")?;

    let (outcome, records) = capture_logs(|| form.submit(true));
    assert_eq!(
        outcome?,
        SubmitOutcome::Submitted(changes(&[("name", Value::String("Ann".into()))]))
    );
    assert_eq!(calls.get(), 2);
    assert!(logged(&records, Level::Warn, "queued submit failed"));
    assert!(!form.has_unsaved_changes());

    // the queue is empty again
    assert_eq!(form.submit(false)?, SubmitOutcome::Submitted(ChangeSet::new()));
    assert_eq!(calls.get(), 3);
    Ok(())
}

#[test]
fn value_changed_fires_for_each_committed_edit() -> eyre::Result<()> {
    facet_form_testhelpers::setup();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let form = Form::<Person, Outline>::builder(Rc::new(RefCell::new(Person::default())))
        .on_value_changed(move |changed| {
            sink.borrow_mut()
                .push((changed.field.to_string(), changed.value.clone(), changed.model.age));
        })
        .build();

    let outline = drawn(&form)?;
    set(&outline, "age", 7)?;
    set(&outline, "name", "Bo")?;
    assert_eq!(
        *seen.borrow(),
        [
            ("age".to_string(), Value::I64(7), 7),
            ("name".to_string(), Value::String("Bo".into()), 7),
        ]
    );
    Ok(())
}

#[test]
fn enter_submits_a_standalone_form() -> eyre::Result<()> {
    facet_form_testhelpers::setup();

    let form = Form::<Person, Outline>::new(Rc::new(RefCell::new(Person::default())));
    assert_eq!(form.key_up("a")?, None);
    assert!(matches!(
        form.key_up("Enter")?,
        Some(SubmitOutcome::Submitted(_))
    ));
    // standalone forms have nobody to notify
    form.on_form_submit()?;
    Ok(())
}

#[test]
fn a_borrowed_model_is_reported_not_panicked_on() -> eyre::Result<()> {
    facet_form_testhelpers::setup();

    let person = Rc::new(RefCell::new(Person::default()));
    let form = Form::<Person, Outline>::new(person.clone());
    let outline = drawn(&form)?;

    let guard = person.borrow_mut();
    assert!(matches!(form.submit(false), Err(FormError::ModelBusy)));
    assert!(matches!(
        outline
            .binding("age")
            .ok_or_else(|| eyre::eyre!("age was not bound"))?
            .set(3),
        Err(FormError::ModelBusy)
    ));
    drop(guard);

    assert!(!form.has_unsaved_changes());
    Ok(())
}
