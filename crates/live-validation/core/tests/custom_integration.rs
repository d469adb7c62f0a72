//! Integration tests with custom selectors, classes and a password validator

use live_validation::dom::memory::{MemoryDom, NodeId, Page, Submission};
use live_validation::{
    use_validation, Controller, ValidationHandle, ValidationOptions, Validators, Verdict,
};
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};

const HTML: &str = r#"
  <form data-testid="form" novalidate="novalidate">
    <div data-testid="emailParent" class="control">
      <label for="email">Email</label>
      <input data-testid="emailField" type="email" id="email" name="email" required>
      <p data-testid="emailMessage" class="message"></p>
    </div>
    <div data-testid="passwordParent" class="control">
      <label for="password">Password</label>
      <input data-testid="passwordField" type="password" id="password" name="password" minlength="6" required>
      <p data-testid="passwordMessage" class="message"></p>
    </div>
    <button data-testid="submitButton" type="submit">Submit</button>
  </form>
"#;

const PASSWORD_MESSAGE: &str = "Password should not be 'password'";

const OPTIONS: &str = r#"{
    "errorSelector": ".message",
    "parentErrorClassName": "is-invalid",
    "parentSelector": ".control"
}"#;

fn password_validator(dom: &MemoryDom, field: &NodeId, _form: &NodeId) -> Verdict {
    Verdict::check(dom.value_of(*field) != "password", PASSWORD_MESSAGE)
}

struct Form {
    page: Page,
    validation: ValidationHandle<MemoryDom>,
}

impl Form {
    fn node(&self, test_id: &str) -> NodeId {
        self.page.get_by_test_id(test_id).unwrap()
    }

    fn is_invalid(&self, test_id: &str) -> bool {
        self.page.dom().has_class(self.node(test_id), "is-invalid")
    }

    fn text(&self, test_id: &str) -> String {
        self.page.dom().text_content(self.node(test_id))
    }

    fn type_into(&mut self, test_id: &str, text: &str) {
        let field = self.node(test_id);
        self.page.replace_text(field, text);
        self.page.run_pending_timers();
    }
}

#[fixture]
fn form() -> Form {
    let mut page = Page::parse(HTML).unwrap();
    let element = page.get_by_test_id("form").unwrap();
    let mut controller: Controller<MemoryDom> = Controller::new(element);
    let validation = use_validation(
        &mut controller,
        &mut page,
        ValidationOptions::from_json(OPTIONS).unwrap(),
        Validators::new().with("password", password_validator),
    );

    Form { page, validation }
}

#[rstest]
fn test_options_overlay_defaults(form: Form) {
    let options = form.validation.options();
    assert_eq!(options.parent_selector, ".control");
    assert_eq!(options.error_selector, ".message");
    assert_eq!(options.group_error_class(), "is-invalid");
    assert_eq!(options.delay, 500);
    assert!(options.disable);
}

#[rstest]
fn test_validates_form_on_submit_button_click(mut form: Form) {
    let submit = form.node("submitButton");
    assert_eq!(form.page.click(submit), Submission::Prevented);

    assert!(form.page.dom().is_disabled_node(submit));
    assert!(form.is_invalid("emailParent"));
    assert!(form.is_invalid("passwordParent"));
    assert_eq!(form.text("passwordMessage"), "Please fill out this field.");
    // the default group class is replaced, not added
    assert!(!form.page.dom().has_class(form.node("emailParent"), "has-error"));
    assert!(form.validation.has_errors());
}

#[rstest]
#[case("incorrectemailaddress", "1234", true)]
#[case("correct@email.address", "123456", false)]
#[case("correct@email.address", "password", true)]
fn test_typed_values(
    mut form: Form,
    #[case] email: &str,
    #[case] password: &str,
    #[case] has_errors: bool,
) {
    form.type_into("emailField", email);
    form.type_into("passwordField", password);

    assert_eq!(form.validation.has_errors(), has_errors);
    assert_eq!(form.page.dom().is_disabled_node(form.node("submitButton")), has_errors);
}

#[rstest]
fn test_validates_form_on_user_input(mut form: Form) {
    form.type_into("emailField", "incorrectemailaddress");
    form.type_into("passwordField", "1234");

    assert!(form.is_invalid("emailParent"));
    assert!(form.is_invalid("passwordParent"));

    form.type_into("emailField", "correct@email.address");
    assert!(!form.is_invalid("emailParent"));

    form.type_into("passwordField", "123456");
    assert!(!form.is_invalid("passwordParent"));
}

#[rstest]
fn test_can_call_validate_form(mut form: Form) {
    form.validation.validate_form(form.page.dom_mut());

    assert!(form.is_invalid("emailParent"));
    assert!(form.is_invalid("passwordParent"));
    assert!(form.validation.has_errors());

    let email = form.node("emailField");
    let password = form.node("passwordField");
    form.page.set_value(email, "correct@email.address");
    form.page.set_value(password, "123456");

    let reports = form.validation.validate_form(form.page.dom_mut());

    assert!(reports.iter().all(|report| report.is_valid));
    assert!(!form.is_invalid("emailParent"));
    assert!(!form.is_invalid("passwordParent"));
    assert!(!form.validation.has_errors());
}

#[rstest]
fn test_accepts_custom_validators(mut form: Form) {
    let password = form.node("passwordField");

    form.page.set_value(password, "password");
    let report = form.validation.validate_field(form.page.dom_mut(), &password).unwrap();

    assert!(!report.is_valid);
    assert!(form.is_invalid("passwordParent"));
    assert_eq!(form.text("passwordMessage"), PASSWORD_MESSAGE);

    form.page.set_value(password, "123456");
    form.validation.validate_field(form.page.dom_mut(), &password);

    assert!(!form.is_invalid("passwordParent"));
    assert_eq!(form.text("passwordMessage"), "");
    assert_eq!(form.page.dom().custom_validity_message(password), "");
}

#[rstest]
fn test_native_failure_wins_over_custom_validator(mut form: Form) {
    form.type_into("passwordField", "pass");

    assert!(form.is_invalid("passwordParent"));
    assert_eq!(
        form.text("passwordMessage"),
        "Please lengthen this text to 6 characters or more (you are currently using 4 characters)."
    );
}
