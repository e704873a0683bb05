use crate::expr::{Expr, LiteralValue};
use crate::stmt::Stmt;

/// Renders the AST in parenthesized prefix form, for debug dumps of the
/// parsed program.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match expr {
            Expr::Literal(literal) => match literal {
                LiteralValue::True => "true".into(),

                LiteralValue::False => "false".into(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => s.clone(),

                LiteralValue::Number(n) => n.to_string(),
            },

            Expr::Grouping(inner) => format!("(group {})", Self::print(inner)),

            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, Self::print(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print(left),
                Self::print(right)
            ),

            Expr::Variable { name, .. } => name.lexeme.clone(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                let mut s: String = format!("(call {}", Self::print(callee));
                for argument in arguments {
                    s.push(' ');
                    s.push_str(&Self::print(argument));
                }
                s.push(')');
                s
            }

            Expr::Get { object, name } => format!("(. {} {})", Self::print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(.= {} {} {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),

            Expr::This { .. } => "this".into(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),
        }
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(expr {})", Self::print(expr)),

            Stmt::Print(expr) => format!("(print {})", Self::print(expr)),

            Stmt::Var { name, initializer } => match initializer {
                Some(init) => format!("(var {} {})", name.lexeme, Self::print(init)),
                None => format!("(var {})", name.lexeme),
            },

            Stmt::Block(statements) => {
                let mut s: String = "(block".to_string();
                for stmt in statements {
                    s.push(' ');
                    s.push_str(&Self::print_stmt(stmt));
                }
                s.push(')');
                s
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch),
                    Self::print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch)
                ),
            },

            Stmt::While { condition, body } => format!(
                "(while {} {})",
                Self::print(condition),
                Self::print_stmt(body)
            ),

            Stmt::Function(declaration) => {
                let mut s: String = format!("(fun {} (", declaration.name.lexeme);
                for (i, param) in declaration.params.iter().enumerate() {
                    if i > 0 {
                        s.push(' ');
                    }
                    s.push_str(&param.lexeme);
                }
                s.push(')');
                for stmt in &declaration.body {
                    s.push(' ');
                    s.push_str(&Self::print_stmt(stmt));
                }
                s.push(')');
                s
            }

            Stmt::Return { value, .. } => match value {
                Some(value) => format!("(return {})", Self::print(value)),
                None => "(return)".into(),
            },

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let mut s: String = format!("(class {}", name.lexeme);
                if let Some(superclass) = superclass {
                    s.push_str(&format!(" < {}", Self::print(superclass)));
                }
                for method in methods {
                    s.push(' ');
                    s.push_str(&Self::print_stmt(&Stmt::Function(method.clone())));
                }
                s.push(')');
                s
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;
    use crate::session::Session;
    use crate::token::Token;

    fn print_source(source: &str) -> String {
        let session = Session::new();
        let tokens: Vec<Token> = Scanner::new(source).filter_map(|r| r.ok()).collect();
        let statements = Parser::new(tokens, &session).parse();
        assert!(!session.had_error());

        statements
            .iter()
            .map(AstPrinter::print_stmt)
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn prints_precedence_explicitly() {
        assert_eq!(print_source("print -123 * (45.67);"), "(print (* (- 123) (group 45.67)))");
    }

    #[test]
    fn prints_declarations() {
        assert_eq!(
            print_source("fun add(a, b) { return a + b; }"),
            "(fun add (a b) (return (+ a b)))"
        );
    }
}
